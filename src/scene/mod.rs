//! Parameter mapping and mode selection.
//!
//! The mapper is a pure function of (smoothed band energy, scene time,
//! visual mode). The mode selector only decides which per-mode formula set
//! the mapper evaluates on the next tick.

mod mapping;
mod mode;

// Re-export public types
pub use mapping::{ModeShading, ParameterMapper, SceneLevels, SceneParameters, ShapeWeights};
pub use mode::{ModeSelector, ShadingFormula, VisualMode};
