//! vibescope library - audio-reactive visualizer pipeline
//!
//! Playback → spectral analysis → parameter mapping → render loop.

pub mod analysis;
pub mod cli;
pub mod error;
pub mod headless;
pub mod params;
pub mod playback;
pub mod render_loop;
pub mod rendering;
pub mod scene;
pub mod status;
