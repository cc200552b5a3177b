//! Realtime playback cursor shared with the output callback.

use std::sync::{Arc, Weak};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::AudioSource;

/// Notifications posted from the output side to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Cursor reached the last frame with looping off; output stopped
    Ended,
    /// Cursor reached the last frame and wrapped to the start
    Looped,
    /// Output device reported a fatal stream error
    DeviceLost(String),
}

/// Fixed-size history of the most recent mono samples.
#[derive(Debug)]
pub(crate) struct TapRing {
    buf: Vec<f32>,
    write: usize,
}

impl TapRing {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len],
            write: 0,
        }
    }

    pub(crate) fn push(&mut self, sample: f32) {
        self.buf[self.write] = sample;
        self.write = (self.write + 1) % self.buf.len();
    }

    pub(crate) fn clear(&mut self) {
        self.buf.fill(0.0);
        self.write = 0;
    }

    /// Copy the history into `out`, oldest first
    pub(crate) fn copy_latest(&self, out: &mut [f32]) {
        let len = self.buf.len().min(out.len());
        let start = (self.write + self.buf.len() - len) % self.buf.len();
        for (i, slot) in out[..len].iter_mut().enumerate() {
            *slot = self.buf[(start + i) % self.buf.len()];
        }
        out[len..].fill(0.0);
    }
}

/// Output-side playback state. Lives behind a mutex shared by the engine
/// (commands) and whichever output drives it (cpal callback or headless).
pub(crate) struct Voice {
    pub(crate) source: Option<Arc<AudioSource>>,
    /// Fractional source frame
    pub(crate) cursor: f64,
    pub(crate) playing: bool,
    pub(crate) looping: bool,
    pub(crate) gain: f32,
    tap: TapRing,
    events: Sender<PlaybackEvent>,
}

impl Voice {
    pub(crate) fn new(tap_len: usize, gain: f32, looping: bool, events: Sender<PlaybackEvent>) -> Self {
        Self {
            source: None,
            cursor: 0.0,
            playing: false,
            looping,
            gain,
            tap: TapRing::new(tap_len),
            events,
        }
    }

    /// Swap in a new source, stopped at frame 0
    pub(crate) fn replace_source(&mut self, source: Arc<AudioSource>) {
        self.source = Some(source);
        self.cursor = 0.0;
        self.playing = false;
        self.tap.clear();
    }

    pub(crate) fn position_s(&self) -> f64 {
        self.source
            .as_ref()
            .map_or(0.0, |s| self.cursor / s.sample_rate() as f64)
    }

    pub(crate) fn read_tap(&self, out: &mut [f32]) {
        self.tap.copy_latest(out);
    }

    pub(crate) fn notify(&self, event: PlaybackEvent) {
        // Engine gone means nobody is listening
        let _ = self.events.send(event);
    }

    /// Fill an interleaved output buffer at `out_rate`.
    ///
    /// End of stream is detected here, on the output side, and reported
    /// once through the event channel.
    pub(crate) fn render(&mut self, out: &mut [f32], out_channels: usize, out_rate: u32) {
        let Some(source) = self.source.clone() else {
            out.fill(0.0);
            return;
        };

        let frames = source.frames() as f64;
        let step = source.sample_rate() as f64 / out_rate as f64;

        for frame in out.chunks_mut(out_channels) {
            if !self.playing {
                frame.fill(0.0);
                continue;
            }

            let mono = source.write_frame(self.cursor, frame);
            for sample in frame.iter_mut() {
                *sample *= self.gain;
            }
            self.tap.push(mono);

            self.cursor += step;
            if self.cursor >= frames {
                if self.looping {
                    self.cursor = (self.cursor - frames).min(frames - 1.0);
                    self.notify(PlaybackEvent::Looped);
                } else {
                    self.cursor = frames;
                    self.playing = false;
                    self.notify(PlaybackEvent::Ended);
                }
            }
        }
    }
}

/// Non-owning read handle onto the engine's live tap point.
///
/// Reading never affects playback. Once the engine is dropped the handle
/// stays valid but reads report no audio.
#[derive(Clone)]
pub struct LiveTap {
    voice: Weak<Mutex<Voice>>,
}

impl LiveTap {
    pub(crate) fn new(voice: &Arc<Mutex<Voice>>) -> Self {
        Self {
            voice: Arc::downgrade(voice),
        }
    }

    /// Copy the most recent mono samples into `out`.
    /// Returns false (and zero-fills) when the engine is gone.
    pub fn read(&self, out: &mut [f32]) -> bool {
        match self.voice.upgrade() {
            Some(voice) => {
                voice.lock().read_tap(out);
                true
            }
            None => {
                out.fill(0.0);
                false
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.voice.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_source(frames: usize, rate: u32) -> Arc<AudioSource> {
        let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
        Arc::new(AudioSource::from_interleaved(samples, 1, rate).unwrap())
    }

    #[test]
    fn test_tap_ring_orders_oldest_first() {
        let mut ring = TapRing::new(4);
        for i in 1..=6 {
            ring.push(i as f32);
        }
        let mut out = [0.0; 4];
        ring.copy_latest(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_render_ends_once_without_loop() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut voice = Voice::new(8, 1.0, false, tx);
        voice.replace_source(ramp_source(100, 100));
        voice.playing = true;

        let mut out = vec![0.0; 300];
        voice.render(&mut out, 1, 100);

        assert!(!voice.playing);
        assert_eq!(voice.position_s(), 1.0);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![PlaybackEvent::Ended]);
        // Output after the end is silence
        assert!(out[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_wraps_with_loop() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut voice = Voice::new(8, 1.0, true, tx);
        voice.replace_source(ramp_source(100, 100));
        voice.playing = true;

        let mut out = vec![0.0; 150];
        voice.render(&mut out, 1, 100);

        assert!(voice.playing);
        assert!((voice.position_s() - 0.5).abs() < 1e-9);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![PlaybackEvent::Looped]);
    }

    #[test]
    fn test_gain_applies_to_output_not_tap() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut voice = Voice::new(4, 0.5, false, tx);
        let source = AudioSource::from_interleaved(vec![1.0; 16], 1, 16).unwrap();
        voice.replace_source(Arc::new(source));
        voice.playing = true;

        let mut out = vec![0.0; 4];
        voice.render(&mut out, 1, 16);
        assert_eq!(out, vec![0.5; 4]);

        let mut tap = [0.0; 4];
        voice.read_tap(&mut tap);
        assert_eq!(tap, [1.0; 4]);
    }

    #[test]
    fn test_live_tap_detaches_when_voice_dropped() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let voice = Arc::new(Mutex::new(Voice::new(4, 1.0, false, tx)));
        let tap = LiveTap::new(&voice);
        let mut out = [1.0; 4];

        assert!(tap.read(&mut out));
        drop(voice);
        assert!(!tap.is_attached());
        assert!(!tap.read(&mut out));
        assert_eq!(out, [0.0; 4]);
    }
}
