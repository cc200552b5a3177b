//! Parameter definitions with units and documented semantics.
//!
//! Every tunable of the pipeline lives here with:
//! - Units (seconds, bins, decibels, percent)
//! - Documented ranges and meanings
//! - A `validate()` that rejects values the pipeline cannot run with

mod analysis;
mod mapping;
mod playback;
mod render;

// Re-export all types
pub use analysis::AnalyzerConfig;
pub use mapping::MappingConfig;
pub use playback::PlaybackConfig;
pub use render::RenderConfig;
