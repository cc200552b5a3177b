//! Playback engine: decoded source, transport state and live output.
//!
//! The engine owns the audio device handle. The analyzer reaches the
//! audio only through a [`LiveTap`], which never keeps the engine alive.

mod engine;
mod output;
mod source;
mod voice;

// Re-export public types
pub use engine::{PlaybackEngine, PlaybackState};
pub use output::{DeviceOutput, HeadlessOutput};
pub use source::{decode_in_background, AudioSource};
pub use voice::{LiveTap, PlaybackEvent};

#[cfg(test)]
pub(crate) use source::tests::wav_bytes;
