//! vibescope - audio-reactive visualizer
//!
//! Plays an audio file and renders a shader scene driven by its spectrum.
//! Drop a file on the window to load it; Space plays and pauses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use vibescope::cli::{Args, Settings};
use vibescope::error::DecodeError;
use vibescope::headless;
use vibescope::playback::{decode_in_background, AudioSource, PlaybackEngine};
use vibescope::render_loop::{FrameClock, RenderLoop, TickOutcome};
use vibescope::rendering::RenderSystem;
use vibescope::scene::{ModeSelector, VisualMode};
use vibescope::status::status_line;

/// Seek step for the arrow keys (seconds)
const SEEK_STEP_S: f64 = 5.0;
/// Volume step for the arrow keys (percent)
const VOLUME_STEP: f32 = 10.0;

/// Completion notifications delivered to the event loop
enum AppEvent {
    Decoded {
        path: PathBuf,
        result: Result<AudioSource, DecodeError>,
    },
}

/// Main application state
struct App {
    settings: Settings,
    proxy: EventLoopProxy<AppEvent>,

    // Window and rendering
    window: Option<Arc<Window>>,
    render_loop: RenderLoop<RenderSystem>,
    clock: FrameClock,

    // Playback
    engine: PlaybackEngine,
    modes: ModeSelector,
    track: Option<String>,

    // Readout
    zen: bool,
    title: String,
}

impl App {
    fn new(settings: Settings, proxy: EventLoopProxy<AppEvent>) -> Self {
        let mut engine = PlaybackEngine::new(&settings.playback, settings.analysis.fft_size);
        // A failed open marks the engine lost, so play is refused
        if engine.open_output_device().is_err() {
            warn!("Continuing without audio output; visuals stay idle");
        }

        let render_loop = RenderLoop::new(
            settings.analysis.clone(),
            settings.mapping.clone(),
            &settings.render,
        );

        Self {
            clock: FrameClock::new(settings.render.max_tick_delta_s),
            modes: ModeSelector::new(settings.mode),
            settings,
            proxy,
            window: None,
            render_loop,
            engine,
            track: None,
            zen: false,
            title: String::new(),
        }
    }

    /// Start decoding `path` off the event loop thread
    fn load(&self, path: PathBuf) {
        let proxy = self.proxy.clone();
        decode_in_background(path, move |path, result| {
            // Event loop gone means the app is shutting down
            let _ = proxy.send_event(AppEvent::Decoded { path, result });
        });
    }

    /// Create a surface for the window and hand it to the render loop
    fn attach_surface(&mut self) -> bool {
        let Some(window) = &self.window else {
            return false;
        };

        match pollster::block_on(RenderSystem::new(Arc::clone(window), &self.settings.render)) {
            Ok(render_system) => {
                self.render_loop.start(render_system, self.engine.tap());
                let size = window.inner_size();
                self.render_loop.resize(size.width, size.height);
                true
            }
            Err(e) => {
                error!("Failed to create rendering surface: {}", e);
                false
            }
        }
    }

    /// Run one tick and refresh the title
    fn render_frame(&mut self) {
        let delta = self.clock.tick();

        let playback = match self.render_loop.tick(delta, &mut self.engine, &self.modes) {
            TickOutcome::Drawn(frame) => frame.playback,
            TickOutcome::SurfaceLost(e) => {
                warn!("Rendering stopped ({}), recreating surface", e);
                if !self.attach_surface() {
                    error!("Surface recreation failed; audio continues without visuals");
                }
                self.engine.state()
            }
            // No surface: keep transport state current for the readout
            TickOutcome::Stopped => self.engine.poll(),
        };

        let title = status_line(self.track.as_deref(), &playback, self.modes.get(), self.zen);
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        let state = self.engine.state();

        let result = match code {
            KeyCode::Escape => {
                event_loop.exit();
                Ok(())
            }
            KeyCode::Space => self.engine.toggle(),
            KeyCode::KeyL => {
                self.engine.set_loop(!state.is_looping);
                Ok(())
            }
            KeyCode::ArrowLeft => self.engine.seek(state.position_s - SEEK_STEP_S).map(|_| ()),
            KeyCode::ArrowRight => self.engine.seek(state.position_s + SEEK_STEP_S).map(|_| ()),
            KeyCode::ArrowUp => {
                self.engine.set_volume(state.volume * 100.0 + VOLUME_STEP);
                Ok(())
            }
            KeyCode::ArrowDown => {
                self.engine.set_volume(state.volume * 100.0 - VOLUME_STEP);
                Ok(())
            }
            KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4 => {
                let index = match code {
                    KeyCode::Digit2 => 1,
                    KeyCode::Digit3 => 2,
                    KeyCode::Digit4 => 3,
                    _ => 0,
                };
                if let Some(mode) = VisualMode::from_index(index) {
                    let previous = self.modes.set(mode);
                    debug!("Mode {} -> {}", previous, mode);
                }
                Ok(())
            }
            KeyCode::KeyZ => {
                self.zen = !self.zen;
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!("{:?}: {}", code, e);
        }
    }

    fn on_decoded(&mut self, path: &Path, result: Result<AudioSource, DecodeError>) {
        match result {
            Ok(source) => {
                self.engine.install(source);
                self.track = Some(
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                );
                info!("Ready: press Space to play");
            }
            // Previous source and transport state stay as they were
            Err(e) => error!("Could not load {}: {}", path.display(), e),
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("vibescope")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.settings.render.window_width,
                self.settings.render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window);

        if !self.attach_surface() {
            event_loop.exit();
            return;
        }

        info!("vibescope is running");
        info!("Space play/pause, L loop, arrows seek/volume, 1-4 mode, Z zen, Esc quit");
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Decoded { path, result } => self.on_decoded(&path, result),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.render_loop.resize(size.width, size.height),
            WindowEvent::DroppedFile(path) => self.load(path),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.render_loop.stop();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = args.settings().context("invalid configuration")?;

    if let Some(seconds) = args.headless {
        let report = headless::run(args.file.as_deref(), seconds, &settings)
            .context("headless run failed")?;
        info!(
            "{} frames, playing={}, position {:.2}s",
            report.frames, report.playback.is_playing, report.playback.position_s
        );
        return Ok(());
    }

    let event_loop = EventLoop::<AppEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let mut app = App::new(settings, event_loop.create_proxy());

    if let Some(path) = args.file.clone() {
        app.load(path);
    }

    event_loop.run_app(&mut app).context("event loop failed")?;
    Ok(())
}
