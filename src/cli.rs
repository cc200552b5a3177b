//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use crate::error::ConfigError;
use crate::params::{AnalyzerConfig, MappingConfig, PlaybackConfig, RenderConfig};
use crate::scene::VisualMode;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "vibescope")]
#[command(about = "Audio-reactive visualizer", long_about = None)]
pub struct Args {
    /// Audio file to load at startup (drop a file on the window to switch)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Visual mode: default, bass, chill, explosive
    #[arg(long, value_name = "MODE", default_value = "default")]
    pub mode: String,

    /// Initial volume (percent, 0-100)
    #[arg(long, value_name = "PERCENT", default_value = "100")]
    pub volume: f32,

    /// Restart from the beginning when the file ends
    #[arg(long = "loop")]
    pub looping: bool,

    /// Smoothing factor for band energies, [0, 1)
    #[arg(long, value_name = "ALPHA", default_value = "0.8")]
    pub smoothing: f32,

    /// Run without window or audio device for the given number of seconds
    #[arg(long, value_name = "SECONDS")]
    pub headless: Option<f32>,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,
}

/// Validated configuration assembled from defaults and arguments
#[derive(Debug, Clone)]
pub struct Settings {
    pub analysis: AnalyzerConfig,
    pub mapping: MappingConfig,
    pub playback: PlaybackConfig,
    pub render: RenderConfig,
    pub mode: VisualMode,
}

impl Args {
    /// Parse visual mode from command-line arguments
    pub fn parse_mode(&self) -> VisualMode {
        match self.mode.parse::<VisualMode>() {
            Ok(mode) => {
                info!("Mode: {}", mode);
                mode
            }
            Err(_) => {
                warn!("Unknown visual mode '{}', using default", self.mode);
                VisualMode::Default
            }
        }
    }

    /// Build and validate every config from the arguments
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        if let Some(seconds) = self.headless {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ConfigError::HeadlessDuration(seconds));
            }
        }

        let analysis = AnalyzerConfig {
            smoothing: self.smoothing,
            ..Default::default()
        };
        analysis.validate()?;

        let mapping = MappingConfig::default();
        mapping.validate()?;

        let render = RenderConfig {
            window_width: self.width,
            window_height: self.height,
            ..Default::default()
        };
        render.validate()?;

        let playback = PlaybackConfig {
            volume_percent: self.volume,
            looping: self.looping,
            ..Default::default()
        };

        Ok(Settings {
            analysis,
            mapping,
            playback,
            render,
            mode: self.parse_mode(),
        })
    }
}
