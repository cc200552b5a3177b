//! Self-driving tick: poll playback → analyze → map → draw.
//!
//! The loop holds the visual surface while Running. A tick is synchronous,
//! so everything it draws comes from one snapshot of playback state and
//! band energy. Losing the surface stops the loop and releases the tap but
//! never touches the playback engine.

use std::time::Instant;

use log::{debug, info, warn};

use crate::analysis::{BandEnergy, SpectralAnalyzer};
use crate::error::DeviceError;
use crate::params::{AnalyzerConfig, MappingConfig, RenderConfig};
use crate::playback::{LiveTap, PlaybackEngine, PlaybackState};
use crate::scene::{ModeSelector, ParameterMapper, SceneParameters};

/// Anything that can present scene parameters once per tick
pub trait SceneSurface {
    /// Recompute projection/aspect state for a new size
    fn resize(&mut self, width: u32, height: u32);

    /// Push parameters into the surface and issue one draw.
    /// An error means the surface is unusable and must be recreated.
    fn draw(&mut self, params: &SceneParameters) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Consistent snapshot used for one drawn frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub playback: PlaybackState,
    pub energy: BandEnergy,
    pub params: SceneParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No surface; nothing happened
    Stopped,
    Drawn(Frame),
    /// Surface failed; the loop is now stopped and awaits a new surface
    SurfaceLost(DeviceError),
}

/// Wall-clock delta between ticks, clamped so a stall does not jump the scene
#[derive(Debug)]
pub struct FrameClock {
    last: Option<Instant>,
    max_delta_s: f32,
}

impl FrameClock {
    pub fn new(max_delta_s: f32) -> Self {
        Self {
            last: None,
            max_delta_s,
        }
    }

    /// Seconds since the previous call (0 on the first call)
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = self
            .last
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta.min(self.max_delta_s)
    }
}

pub struct RenderLoop<S: SceneSurface> {
    surface: Option<S>,
    analyzer: SpectralAnalyzer,
    mapper: ParameterMapper,
    /// Scene time accumulator (scene seconds)
    elapsed: f32,
    time_scale: f32,
    max_delta_s: f32,
    pending_resize: Option<(u32, u32)>,
    frames: u64,
}

impl<S: SceneSurface> RenderLoop<S> {
    pub fn new(analysis: AnalyzerConfig, mapping: MappingConfig, render: &RenderConfig) -> Self {
        Self {
            surface: None,
            analyzer: SpectralAnalyzer::new(analysis),
            mapper: ParameterMapper::new(mapping),
            elapsed: 0.0,
            time_scale: render.time_scale,
            max_delta_s: render.max_tick_delta_s,
            pending_resize: None,
            frames: 0,
        }
    }

    /// Take ownership of a surface and begin ticking.
    /// Scene time carries over from any previous surface.
    pub fn start(&mut self, surface: S, tap: LiveTap) {
        if self.surface.is_some() {
            debug!("Replacing running surface");
        }
        self.surface = Some(surface);
        self.analyzer.attach_tap(tap);
        info!("Render loop running");
    }

    /// Release the surface and the tap. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.surface.take().is_some() {
            info!("Render loop stopped after {} frames", self.frames);
        }
        self.analyzer.detach_tap();
        self.pending_resize = None;
    }

    pub fn state(&self) -> LoopState {
        if self.surface.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Queue a resize; applied before the next draw. Only the latest size counts.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.pending_resize = Some((width, height));
        }
    }

    /// Run one tick with `delta_s` wall-clock seconds since the previous one
    pub fn tick(
        &mut self,
        delta_s: f32,
        engine: &mut PlaybackEngine,
        modes: &ModeSelector,
    ) -> TickOutcome {
        let Some(surface) = self.surface.as_mut() else {
            return TickOutcome::Stopped;
        };

        let playback = engine.poll();

        let delta_s = if delta_s.is_finite() {
            delta_s.clamp(0.0, self.max_delta_s)
        } else {
            0.0
        };
        self.elapsed += delta_s * self.time_scale;

        let energy = self.analyzer.update(playback.is_playing);
        let params = self.mapper.map(&energy, self.elapsed, modes.get());

        if let Some((width, height)) = self.pending_resize.take() {
            surface.resize(width, height);
        }

        match surface.draw(&params) {
            Ok(()) => {
                self.frames += 1;
                TickOutcome::Drawn(Frame {
                    playback,
                    energy,
                    params,
                })
            }
            Err(err) => {
                warn!("Surface lost: {}", err);
                self.stop();
                TickOutcome::SurfaceLost(err)
            }
        }
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Frames drawn since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Scene time accumulator
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}
