//! Windowless run of the full pipeline.
//!
//! Playback is driven by a [`HeadlessOutput`](crate::playback::HeadlessOutput)
//! at a fixed tick rate and frames go to a surface that logs scene
//! parameters once per simulated second.

use std::path::Path;

use log::info;

use crate::cli::Settings;
use crate::error::{DeviceError, PlaybackError};
use crate::playback::{PlaybackEngine, PlaybackState};
use crate::render_loop::{RenderLoop, SceneSurface, TickOutcome};
use crate::scene::{ModeSelector, SceneParameters};

/// Simulated display refresh rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Surface that logs instead of drawing
#[derive(Debug, Default)]
pub struct LogSurface {
    draws: u64,
    size: (u32, u32),
    last: Option<SceneParameters>,
}

impl LogSurface {
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn last(&self) -> Option<&SceneParameters> {
        self.last.as_ref()
    }
}

impl SceneSurface for LogSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn draw(&mut self, params: &SceneParameters) -> Result<(), DeviceError> {
        if self.draws % TICK_RATE as u64 == 0 {
            let l = &params.levels;
            info!(
                "t={:.2} mode={} level={:.3} bass={:.3} mid={:.3} treble={:.3} peak={:.3} rot={:.3}",
                l.time, params.mode, l.level, l.bass, l.mid, l.treble, l.peak, l.rotation_speed
            );
        }
        self.draws += 1;
        self.last = Some(*params);
        Ok(())
    }
}

/// Outcome of a headless run
#[derive(Debug, Clone)]
pub struct HeadlessReport {
    pub frames: u64,
    pub playback: PlaybackState,
    pub last: Option<SceneParameters>,
}

/// Run the pipeline for `seconds` of simulated time.
/// `seconds` is expected finite; [`Args::settings`](crate::cli::Args::settings) rejects anything else.
pub fn run(
    file: Option<&Path>,
    seconds: f32,
    settings: &Settings,
) -> Result<HeadlessReport, PlaybackError> {
    let mut engine = PlaybackEngine::new(&settings.playback, settings.analysis.fft_size);
    if let Some(path) = file {
        engine.load_path(path)?;
    }
    let mut output = engine.headless_output(settings.playback.headless_sample_rate, 2);

    let modes = ModeSelector::new(settings.mode);
    let mut render_loop = RenderLoop::new(
        settings.analysis.clone(),
        settings.mapping.clone(),
        &settings.render,
    );
    let mut surface = LogSurface::default();
    surface.resize(settings.render.window_width, settings.render.window_height);
    render_loop.start(surface, engine.tap());

    if engine.is_loaded() {
        engine.play()?;
    }

    let dt = 1.0 / TICK_RATE as f32;
    let ticks = (seconds.max(0.0) * TICK_RATE as f32).round() as u64;
    info!("Headless run: {} ticks at {} Hz", ticks, TICK_RATE);

    for _ in 0..ticks {
        output.advance(dt as f64);
        if let TickOutcome::SurfaceLost(err) = render_loop.tick(dt, &mut engine, &modes) {
            return Err(err.into());
        }
    }

    let playback = engine.poll();
    let last = render_loop.surface().and_then(|s| s.last().copied());
    let frames = render_loop.frames();
    render_loop.stop();

    info!(
        "Headless run finished: {} frames, position {:.2}s / {:.2}s",
        frames, playback.position_s, playback.duration_s
    );

    Ok(HeadlessReport {
        frames,
        playback,
        last,
    })
}
