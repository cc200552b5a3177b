//! Rendering and render-loop configuration.

use crate::error::ConfigError;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Scene seconds per wall-clock second
    /// 0.6 = 0.01 per frame at 60 Hz
    pub time_scale: f32,

    /// Upper bound for a single tick's wall-clock delta (seconds)
    /// Keeps a stalled frame from jumping the animation
    pub max_tick_delta_s: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            time_scale: 0.6,
            max_tick_delta_s: 0.1,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::WindowSize {
                width: self.window_width,
                height: self.window_height,
            });
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(ConfigError::TimeScale(self.time_scale));
        }
        Ok(())
    }
}
