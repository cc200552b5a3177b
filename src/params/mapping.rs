//! Band energy to scene parameter mapping constants.

use crate::error::ConfigError;

/// Scale factors from smoothed band energy to scene parameters
#[derive(Debug, Clone)]
pub struct MappingConfig {
    /// Amplification applied to level/band scalars
    /// Formula: value = clamp(smoothed * level_scale + level_offset, 0, 1)
    pub level_scale: f32,

    /// Floor so near-silence still yields a visible presence
    pub level_offset: f32,

    /// Scale factor: bass energy → rotation rate (radians per scene second)
    /// Formula: rotation = bass * rotation_scale + rotation_offset
    pub rotation_scale: f32,

    /// Rotation rate at silence
    pub rotation_offset: f32,

    /// Level thresholds for the default-mode silhouette
    /// [0]: circle starts blending toward square
    /// [1]: pure square
    /// [2]: square starts blending toward diamond (pure diamond at level 1.0)
    pub shape_thresholds: [f32; 3],
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            level_scale: 5.0,
            level_offset: 0.1,
            rotation_scale: 5.0,
            rotation_offset: 0.2,
            shape_thresholds: [0.4, 0.7, 0.9],
        }
    }
}

impl MappingConfig {
    /// Documented range of the rotation rate: (silence, full bass)
    pub fn rotation_range(&self) -> (f32, f32) {
        (
            self.rotation_offset,
            self.rotation_offset + self.rotation_scale,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [a, b, c] = self.shape_thresholds;
        if !(0.0 < a && a < b && b < c && c < 1.0) {
            return Err(ConfigError::ShapeThresholds(self.shape_thresholds));
        }
        if self.rotation_scale < 0.0 || !self.rotation_scale.is_finite() {
            return Err(ConfigError::RotationScale(self.rotation_scale));
        }
        Ok(())
    }
}
