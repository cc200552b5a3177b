//! Transport state machine owning the audio source and output device.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use parking_lot::Mutex;

use super::output::{DeviceOutput, HeadlessOutput};
use super::voice::{LiveTap, PlaybackEvent, Voice};
use super::AudioSource;
use crate::error::{DeviceError, PlaybackError};
use crate::params::PlaybackConfig;

/// Observable transport state.
///
/// `position_s` is always within `[0, duration_s]`; `is_playing` is false
/// whenever no source is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_looping: bool,
    /// Output gain in [0, 1]
    pub volume: f32,
    pub position_s: f64,
    /// 0 when nothing is loaded
    pub duration_s: f64,
}

enum OutputState {
    /// Nothing attached yet; `play` is rejected
    Detached,
    Device(DeviceOutput),
    /// Driven by a [`HeadlessOutput`] the caller advances
    Headless,
    /// Device failed to open or reported a fatal error; kept until a new
    /// device is opened
    Lost,
}

/// Playback engine: owns the source, the output device handle and the
/// transport state. Mutated only by transport commands and by
/// notifications drained in [`PlaybackEngine::poll`].
pub struct PlaybackEngine {
    // Dropped first so the stream releases its voice handle
    output: OutputState,
    voice: Arc<Mutex<Voice>>,
    events_tx: Sender<PlaybackEvent>,
    events_rx: Receiver<PlaybackEvent>,
    source: Option<Arc<AudioSource>>,
    state: PlaybackState,
}

impl PlaybackEngine {
    /// Create an engine with no source and no output device.
    /// `tap_len` is the number of recent samples exposed to the analyzer.
    pub fn new(config: &PlaybackConfig, tap_len: usize) -> Self {
        let (events_tx, events_rx) = unbounded();
        let volume = percent_to_gain(config.volume_percent);
        let voice = Voice::new(tap_len.max(1), volume, config.looping, events_tx.clone());

        Self {
            output: OutputState::Detached,
            voice: Arc::new(Mutex::new(voice)),
            events_tx,
            events_rx,
            source: None,
            state: PlaybackState {
                is_looping: config.looping,
                volume,
                ..Default::default()
            },
        }
    }

    /// Attach the default audio output device.
    ///
    /// On failure the engine is marked lost: a loaded file can still be
    /// seeked but `play` returns [`DeviceError::AudioLost`].
    pub fn open_output_device(&mut self) -> Result<(), DeviceError> {
        self.attach_device(DeviceOutput::open(
            Arc::clone(&self.voice),
            self.events_tx.clone(),
        ))
    }

    fn attach_device(
        &mut self,
        opened: Result<DeviceOutput, DeviceError>,
    ) -> Result<(), DeviceError> {
        match opened {
            Ok(device) => {
                info!(
                    "Audio output: {} ({} Hz, {} ch)",
                    device.device_name(),
                    device.sample_rate(),
                    device.channels()
                );
                self.output = OutputState::Device(device);
                Ok(())
            }
            Err(e) => {
                error!("Audio output unavailable: {}", e);
                self.voice.lock().playing = false;
                self.state.is_playing = false;
                self.output = OutputState::Lost;
                Err(e)
            }
        }
    }

    /// Create an output driven by explicit time steps and make it the
    /// engine's output
    pub fn headless_output(&mut self, sample_rate: u32, channels: u16) -> HeadlessOutput {
        self.output = OutputState::Headless;
        HeadlessOutput::new(Arc::clone(&self.voice), sample_rate, channels)
    }

    /// Read handle for the spectral analyzer
    pub fn tap(&self) -> LiveTap {
        LiveTap::new(&self.voice)
    }

    /// Decode `path` synchronously and make it the current source.
    /// On failure the previous source and state are left untouched.
    pub fn load_path(&mut self, path: &Path) -> Result<&AudioSource, PlaybackError> {
        let source = AudioSource::open(path)?;
        Ok(self.install(source))
    }

    /// Decode an in-memory byte stream and make it the current source
    pub fn load_bytes(
        &mut self,
        bytes: Vec<u8>,
        extension: Option<&str>,
    ) -> Result<&AudioSource, PlaybackError> {
        let source = AudioSource::decode(bytes, extension)?;
        Ok(self.install(source))
    }

    /// Replace the current source with an already-decoded one.
    /// Position resets to 0 and playback stops.
    pub fn install(&mut self, source: AudioSource) -> &AudioSource {
        let source = Arc::new(source);
        self.voice.lock().replace_source(Arc::clone(&source));

        // Notifications from the previous source no longer apply
        let stale = self.events_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} stale playback notifications", stale);
        }

        self.state.is_playing = false;
        self.state.position_s = 0.0;
        self.state.duration_s = source.duration_s();
        info!("Loaded audio: {:.2}s", self.state.duration_s);

        &**self.source.insert(source)
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// Whether the device has reported a fatal error since it was opened
    pub fn is_device_lost(&self) -> bool {
        matches!(self.output, OutputState::Lost)
    }

    /// Start or resume playback. Playing from the end restarts at 0.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::NotLoaded);
        }
        self.apply_events();
        match self.output {
            OutputState::Device(_) | OutputState::Headless => {}
            OutputState::Detached => {
                return Err(DeviceError::AudioLost("no audio output attached".to_string()).into())
            }
            OutputState::Lost => {
                return Err(DeviceError::AudioLost("output device unavailable".to_string()).into())
            }
        }
        if self.state.position_s >= self.state.duration_s {
            self.set_position(0.0);
        }

        self.voice.lock().playing = true;
        self.state.is_playing = true;
        debug!("Play at {:.2}s", self.state.position_s);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::NotLoaded);
        }
        self.apply_events();

        let mut voice = self.voice.lock();
        voice.playing = false;
        self.state.position_s = voice.position_s().min(self.state.duration_s);
        self.state.is_playing = false;
        debug!("Pause at {:.2}s", self.state.position_s);
        Ok(())
    }

    /// Play if paused, pause if playing
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        self.apply_events();
        if self.state.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Move to `seconds`, clamped to `[0, duration]`.
    /// While playing, output continues from the new position without restarting.
    pub fn seek(&mut self, seconds: f64) -> Result<f64, PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::NotLoaded);
        }
        // A pending end notification must not overwrite the new position
        self.apply_events();
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.state.duration_s)
        };
        self.set_position(target);
        debug!("Seek to {:.2}s", target);
        Ok(target)
    }

    fn set_position(&mut self, seconds: f64) {
        if let Some(source) = &self.source {
            self.voice.lock().cursor = seconds * source.sample_rate() as f64;
        }
        self.state.position_s = seconds;
    }

    /// Set volume from a percentage; values outside 0-100 are clamped.
    /// Applies to the live output immediately.
    pub fn set_volume(&mut self, percent: f32) {
        let gain = percent_to_gain(percent);
        self.voice.lock().gain = gain;
        self.state.volume = gain;
        debug!("Volume {:.0}%", gain * 100.0);
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.voice.lock().looping = looping;
        self.state.is_looping = looping;
        debug!("Loop {}", if looping { "on" } else { "off" });
    }

    /// Current state as of the last command or poll
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Apply pending output notifications and refresh the position.
    ///
    /// End of stream is taken from the output's notification only; the
    /// engine never infers it from comparing times.
    pub fn poll(&mut self) -> PlaybackState {
        self.apply_events();

        if self.state.is_playing {
            let position = self.voice.lock().position_s();
            self.state.position_s = position.clamp(0.0, self.state.duration_s);
        }

        self.state
    }

    fn apply_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                PlaybackEvent::Ended => {
                    info!("Reached end of stream");
                    self.state.is_playing = false;
                    self.state.position_s = self.state.duration_s;
                }
                PlaybackEvent::Looped => {
                    info!("Looped to start");
                }
                PlaybackEvent::DeviceLost(reason) => {
                    error!("Audio output lost: {}", reason);
                    self.output = OutputState::Lost;
                    self.voice.lock().playing = false;
                    self.state.is_playing = false;
                }
            }
        }
    }
}

fn percent_to_gain(percent: f32) -> f32 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0) / 100.0
}
