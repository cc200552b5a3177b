//! Smoothed band energy + elapsed time → scene parameters.
//!
//! Everything here is a pure function of its inputs. The shared levels are
//! mode-agnostic; each visual mode then evaluates its own formula set on top
//! of them.

use super::mode::VisualMode;
use crate::analysis::BandEnergy;
use crate::params::MappingConfig;

/// Mode-agnostic levels, each clamped to its documented range
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneLevels {
    /// Scene time accumulator (scene seconds)
    pub time: f32,
    /// Overall level from the average band, [0, 1]
    pub level: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub peak: f32,
    /// Rotation rate (radians per scene second), within `MappingConfig::rotation_range`
    pub rotation_speed: f32,
}

/// Blend weights of the three default-mode silhouettes; always sum to 1
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeWeights {
    pub circle: f32,
    pub square: f32,
    pub diamond: f32,
}

impl ShapeWeights {
    pub const CIRCLE: Self = Self {
        circle: 1.0,
        square: 0.0,
        diamond: 0.0,
    };

    /// Silhouette blend for `level` given ascending `thresholds`:
    /// circle below the first, circle→square up to the second, square up to
    /// the third, then square→diamond reaching pure diamond at level 1.
    pub fn for_level(level: f32, thresholds: [f32; 3]) -> Self {
        let [blend_start, square_at, diamond_start] = thresholds;

        if level < blend_start {
            Self::CIRCLE
        } else if level < square_at {
            let t = (level - blend_start) / (square_at - blend_start);
            Self {
                circle: 1.0 - t,
                square: t,
                diamond: 0.0,
            }
        } else if level < diamond_start {
            Self {
                circle: 0.0,
                square: 1.0,
                diamond: 0.0,
            }
        } else {
            let t = ((level - diamond_start) / (1.0 - diamond_start)).clamp(0.0, 1.0);
            Self {
                circle: 0.0,
                square: 1.0 - t,
                diamond: t,
            }
        }
    }
}

/// Mode-specific shading inputs, one variant per visual mode
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModeShading {
    Default {
        /// Shape rotation (radians)
        angle: f32,
        /// Shape half-extent in quad units
        size: f32,
        shapes: ShapeWeights,
        /// Fill hue in [0, 1)
        hue: f32,
    },
    Bass {
        /// Interference grid phase
        phase: f32,
        /// Invert colours on loud peaks
        inverted: bool,
    },
    Chill {
        ripple: f32,
        spokes: f32,
        /// Additive RGB tint
        tint: [f32; 3],
    },
    Explosive {
        /// Ring phase
        ring: f32,
        /// Flash intensity on strong peaks, 0 when quiet
        flash: f32,
    },
}

impl ModeShading {
    /// Pack into two vec4 uniform slots. Layout per mode:
    /// - Default: (angle, size, hue, _), (circle, square, diamond, _)
    /// - Bass: (phase, inverted, _, _)
    /// - Chill: (ripple, spokes, _, _), (tint.r, tint.g, tint.b, _)
    /// - Explosive: (ring, flash, _, _)
    pub fn pack(&self) -> ([f32; 4], [f32; 4]) {
        match *self {
            ModeShading::Default {
                angle,
                size,
                shapes,
                hue,
            } => (
                [angle, size, hue, 0.0],
                [shapes.circle, shapes.square, shapes.diamond, 0.0],
            ),
            ModeShading::Bass { phase, inverted } => {
                ([phase, if inverted { 1.0 } else { 0.0 }, 0.0, 0.0], [0.0; 4])
            }
            ModeShading::Chill {
                ripple,
                spokes,
                tint,
            } => ([ripple, spokes, 0.0, 0.0], [tint[0], tint[1], tint[2], 0.0]),
            ModeShading::Explosive { ring, flash } => ([ring, flash, 0.0, 0.0], [0.0; 4]),
        }
    }
}

pub(crate) fn default_shading(levels: &SceneLevels, config: &MappingConfig) -> ModeShading {
    let t = levels.time;
    ModeShading::Default {
        angle: t * levels.rotation_speed,
        size: 0.3 + 0.05 * t.sin() + 0.1 * levels.level,
        shapes: ShapeWeights::for_level(levels.level, config.shape_thresholds),
        hue: (levels.bass * 2.0 + t * 0.1).rem_euclid(1.0),
    }
}

pub(crate) fn bass_shading(levels: &SceneLevels, _config: &MappingConfig) -> ModeShading {
    ModeShading::Bass {
        phase: levels.time * levels.bass * 10.0,
        inverted: levels.peak > 0.8,
    }
}

pub(crate) fn chill_shading(levels: &SceneLevels, _config: &MappingConfig) -> ModeShading {
    let t = levels.time;
    ModeShading::Chill {
        ripple: t * 2.0,
        spokes: t * 3.0,
        tint: [
            (t * 0.5).sin() * 0.5 + 0.5 + levels.bass * 0.5,
            (t * 0.7).cos() * 0.5 + 0.5 + levels.mid * 0.3,
            (t * 0.9).sin() * 0.5 + 0.5 + levels.treble * 0.2,
        ],
    }
}

pub(crate) fn explosive_shading(levels: &SceneLevels, _config: &MappingConfig) -> ModeShading {
    let flash = if levels.peak > 0.9 {
        (levels.peak - 0.9) * 10.0
    } else {
        0.0
    };
    ModeShading::Explosive {
        ring: levels.time * levels.peak * 4.0,
        flash,
    }
}

/// Everything the rendering surface needs for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneParameters {
    pub levels: SceneLevels,
    pub mode: VisualMode,
    pub shading: ModeShading,
}

/// Maps smoothed band energy onto scene parameters
#[derive(Debug, Clone, Default)]
pub struct ParameterMapper {
    config: MappingConfig,
}

impl ParameterMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Amplify, offset and clamp a smoothed scalar into [0, 1]
    pub fn scale_level(&self, smoothed: f32) -> f32 {
        (smoothed * self.config.level_scale + self.config.level_offset).clamp(0.0, 1.0)
    }

    pub fn rotation_speed(&self, bass: f32) -> f32 {
        let (min, max) = self.config.rotation_range();
        (bass * self.config.rotation_scale + self.config.rotation_offset).clamp(min, max)
    }

    /// Shared levels for one tick
    pub fn levels(&self, energy: &BandEnergy, time: f32) -> SceneLevels {
        SceneLevels {
            time,
            level: self.scale_level(energy.average),
            bass: self.scale_level(energy.bass),
            mid: self.scale_level(energy.mid),
            treble: self.scale_level(energy.treble),
            peak: self.scale_level(energy.peak),
            rotation_speed: self.rotation_speed(energy.bass),
        }
    }

    /// Full scene parameters for one tick under `mode`
    pub fn map(&self, energy: &BandEnergy, time: f32, mode: VisualMode) -> SceneParameters {
        let levels = self.levels(energy, time);
        SceneParameters {
            levels,
            mode,
            shading: (mode.formula())(&levels, &self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SpectralAnalyzer, MAX_BIN_VALUE};
    use crate::params::AnalyzerConfig;

    const THRESHOLDS: [f32; 3] = [0.4, 0.7, 0.9];

    #[test]
    fn test_level_scaling_has_floor_and_saturates() {
        let mapper = ParameterMapper::default();

        assert!((mapper.scale_level(0.0) - 0.1).abs() < 1e-6);
        assert!((mapper.scale_level(0.1) - 0.6).abs() < 1e-6);
        assert_eq!(mapper.scale_level(0.5), 1.0);
        assert_eq!(mapper.scale_level(-1.0), 0.0);
    }

    #[test]
    fn test_shape_weights_follow_thresholds() {
        assert_eq!(ShapeWeights::for_level(0.1, THRESHOLDS), ShapeWeights::CIRCLE);

        let mid_blend = ShapeWeights::for_level(0.55, THRESHOLDS);
        assert!((mid_blend.circle - 0.5).abs() < 1e-5);
        assert!((mid_blend.square - 0.5).abs() < 1e-5);

        let square = ShapeWeights::for_level(0.8, THRESHOLDS);
        assert_eq!(square.square, 1.0);

        let diamond = ShapeWeights::for_level(1.0, THRESHOLDS);
        assert!((diamond.diamond - 1.0).abs() < 1e-5);
        assert!(diamond.square.abs() < 1e-5);

        for level in [0.0, 0.39, 0.4, 0.65, 0.7, 0.89, 0.9, 0.95, 1.0] {
            let w = ShapeWeights::for_level(level, THRESHOLDS);
            assert!((w.circle + w.square + w.diamond - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_map_is_pure() {
        let mapper = ParameterMapper::default();
        let energy = BandEnergy {
            bass: 0.3,
            mid: 0.2,
            treble: 0.05,
            average: 0.12,
            peak: 0.4,
        };

        for mode in VisualMode::ALL {
            let first = mapper.map(&energy, 3.7, mode);
            let second = mapper.map(&energy, 3.7, mode);
            assert_eq!(first, second);
            assert_eq!(first.levels, mapper.levels(&energy, 3.7));
        }
    }

    #[test]
    fn test_mode_only_changes_shading() {
        let mapper = ParameterMapper::default();
        let energy = BandEnergy {
            bass: 0.1,
            ..BandEnergy::ZERO
        };

        let default = mapper.map(&energy, 1.0, VisualMode::Default);
        let chill = mapper.map(&energy, 1.0, VisualMode::Chill);

        assert_eq!(default.levels, chill.levels);
        assert!(matches!(default.shading, ModeShading::Default { .. }));
        assert!(matches!(chill.shading, ModeShading::Chill { .. }));
    }

    #[test]
    fn test_bass_snapshot_drives_rotation_to_maximum() {
        let mapper = ParameterMapper::default();
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        let mut bins = vec![0.0; 1024];
        bins[..10].fill(MAX_BIN_VALUE);

        let mut energy = BandEnergy::ZERO;
        for _ in 0..100 {
            energy = analyzer.ingest_bins(&bins);
        }
        let params = mapper.map(&energy, 1.0, VisualMode::Default);

        let (_, max_rotation) = mapper.config().rotation_range();
        assert!((params.levels.rotation_speed - max_rotation).abs() < 1e-4);
        assert_eq!(analyzer.raw().treble, 0.0);
        assert!((params.levels.treble - 0.1).abs() < 1e-6);
        assert_eq!(params.levels.bass, 1.0);
    }

    #[test]
    fn test_bass_mode_inverts_on_loud_peak() {
        let mapper = ParameterMapper::default();
        let quiet = mapper.map(&BandEnergy::ZERO, 2.0, VisualMode::Bass);
        let loud = mapper.map(
            &BandEnergy {
                peak: 0.5,
                ..BandEnergy::ZERO
            },
            2.0,
            VisualMode::Bass,
        );

        assert!(matches!(quiet.shading, ModeShading::Bass { inverted: false, .. }));
        assert!(matches!(loud.shading, ModeShading::Bass { inverted: true, .. }));
    }

    #[test]
    fn test_explosive_flash_only_above_threshold() {
        let levels = SceneLevels {
            time: 1.0,
            peak: 0.95,
            ..Default::default()
        };
        let config = MappingConfig::default();

        match explosive_shading(&levels, &config) {
            ModeShading::Explosive { ring, flash } => {
                assert!((ring - 3.8).abs() < 1e-5);
                assert!((flash - 0.5).abs() < 1e-5);
            }
            other => panic!("unexpected shading {:?}", other),
        }

        let calm = SceneLevels { peak: 0.9, ..levels };
        assert!(matches!(
            explosive_shading(&calm, &config),
            ModeShading::Explosive { flash, .. } if flash == 0.0
        ));
    }

    #[test]
    fn test_pack_default_layout() {
        let shading = ModeShading::Default {
            angle: 1.0,
            size: 0.35,
            shapes: ShapeWeights::CIRCLE,
            hue: 0.25,
        };
        let (a, b) = shading.pack();
        assert_eq!(a, [1.0, 0.35, 0.25, 0.0]);
        assert_eq!(b, [1.0, 0.0, 0.0, 0.0]);
    }
}
