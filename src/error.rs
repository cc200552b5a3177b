//! Error taxonomy shared by playback, analysis and rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Input could not be turned into an [`AudioSource`](crate::playback::AudioSource).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt audio: {0}")]
    UnsupportedFormat(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("audio track does not declare a sample rate")]
    UnknownSampleRate,

    #[error("audio stream contains no samples")]
    Empty,
}

/// Audio or graphics device unavailable or lost.
///
/// Fatal to the owning subsystem only: a lost audio device leaves the
/// analyzer reading silence, a lost graphics device halts the render loop
/// while playback carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("failed to query audio output config: {0}")]
    OutputConfig(String),

    #[error("failed to build audio stream: {0}")]
    BuildStream(String),

    #[error("failed to start audio stream: {0}")]
    PlayStream(String),

    #[error("audio device lost: {0}")]
    AudioLost(String),

    #[error("failed to initialise graphics: {0}")]
    GraphicsInit(String),

    #[error("graphics device lost: {0}")]
    GraphicsLost(String),
}

/// Transport command failures.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Command issued before any file was loaded; nothing changed.
    #[error("no audio loaded")]
    NotLoaded,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Invalid tunables in [`crate::params`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("FFT size must be a power of two >= 32, got {0}")]
    FftSize(usize),

    #[error("smoothing factor must lie in [0, 1), got {0}")]
    Smoothing(f32),

    #[error("decibel range is empty: min {min} dB >= max {max} dB")]
    DecibelRange { min: f32, max: f32 },

    #[error("{0} band is empty at the configured FFT size")]
    EmptyBand(&'static str),

    #[error("window size must be non-zero, got {width}x{height}")]
    WindowSize { width: u32, height: u32 },

    #[error("time scale must be positive and finite, got {0}")]
    TimeScale(f32),

    #[error("shape thresholds must be strictly increasing inside (0, 1), got {0:?}")]
    ShapeThresholds([f32; 3]),

    #[error("rotation scale must be non-negative and finite, got {0}")]
    RotationScale(f32),

    #[error("headless duration must be non-negative and finite, got {0}")]
    HeadlessDuration(f32),
}
