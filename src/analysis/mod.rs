//! Spectral analysis of the live tap.
//!
//! Once per tick the analyzer turns the most recent samples into byte-scaled
//! frequency bins, averages them into bass/mid/treble bands and smooths each
//! channel exponentially for stable control signals.

mod bands;
mod fft;

// Re-export public types
pub use bands::{BandEnergy, SpectralAnalyzer};
pub use fft::{hann_window, Spectrum, MAX_BIN_VALUE};
