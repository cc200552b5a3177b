//! Transport defaults.

/// Initial transport settings applied when the engine is created
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Initial volume (percent, 0-100)
    pub volume_percent: f32,

    /// Restart from the beginning when the stream ends
    pub looping: bool,

    /// Output rate for headless runs (Hz)
    pub headless_sample_rate: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume_percent: 100.0,
            looping: false,
            headless_sample_rate: 44100,
        }
    }
}
