//! Visual modes and the selector the render loop reads each tick.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use super::mapping::{bass_shading, chill_shading, default_shading, explosive_shading};
use super::{ModeShading, SceneLevels};
use crate::params::MappingConfig;

/// Per-mode formula turning shared levels into mode-specific shading inputs
pub type ShadingFormula = fn(&SceneLevels, &MappingConfig) -> ModeShading;

/// Selectable formula set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisualMode {
    /// Rotating shape morphing circle → square → diamond with level
    #[default]
    Default,
    /// Interference grid pulsing with bass, inverting on loud peaks
    Bass,
    /// Kaleidoscope ripples with slowly drifting tint
    Chill,
    /// Expanding rings with a flash on strong peaks
    Explosive,
}

impl VisualMode {
    pub const ALL: [VisualMode; 4] = [
        VisualMode::Default,
        VisualMode::Bass,
        VisualMode::Chill,
        VisualMode::Explosive,
    ];

    /// Index handed to the shader
    pub fn index(self) -> u32 {
        match self {
            VisualMode::Default => 0,
            VisualMode::Bass => 1,
            VisualMode::Chill => 2,
            VisualMode::Explosive => 3,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            VisualMode::Default => "default",
            VisualMode::Bass => "bass",
            VisualMode::Chill => "chill",
            VisualMode::Explosive => "explosive",
        }
    }

    /// Formula set evaluated while this mode is active
    pub fn formula(self) -> ShadingFormula {
        match self {
            VisualMode::Default => default_shading,
            VisualMode::Bass => bass_shading,
            VisualMode::Chill => chill_shading,
            VisualMode::Explosive => explosive_shading,
        }
    }
}

impl fmt::Display for VisualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VisualMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == name)
            .ok_or_else(|| format!("unknown visual mode '{}'", s))
    }
}

/// Holds the active mode. A set is a single atomic swap; the render loop
/// picks up whatever value is current when the next tick starts.
#[derive(Debug, Default)]
pub struct ModeSelector {
    current: AtomicU8,
}

impl ModeSelector {
    pub fn new(mode: VisualMode) -> Self {
        Self {
            current: AtomicU8::new(mode.index() as u8),
        }
    }

    /// Switch modes, returning the previous one
    pub fn set(&self, mode: VisualMode) -> VisualMode {
        let previous = self.current.swap(mode.index() as u8, Ordering::AcqRel);
        VisualMode::from_index(previous as u32).unwrap_or_default()
    }

    pub fn get(&self) -> VisualMode {
        VisualMode::from_index(self.current.load(Ordering::Acquire) as u32).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trips_through_index_and_name() {
        for mode in VisualMode::ALL {
            assert_eq!(VisualMode::from_index(mode.index()), Some(mode));
            assert_eq!(mode.name().parse::<VisualMode>(), Ok(mode));
        }
        assert_eq!(VisualMode::from_index(4), None);
        assert_eq!(" Chill ".parse::<VisualMode>(), Ok(VisualMode::Chill));
        assert!("disco".parse::<VisualMode>().is_err());
    }

    #[test]
    fn test_selector_keeps_only_latest_value() {
        let selector = ModeSelector::default();
        assert_eq!(selector.get(), VisualMode::Default);

        selector.set(VisualMode::Bass);
        selector.set(VisualMode::Explosive);
        let previous = selector.set(VisualMode::Chill);

        assert_eq!(previous, VisualMode::Explosive);
        assert_eq!(selector.get(), VisualMode::Chill);
    }
}
