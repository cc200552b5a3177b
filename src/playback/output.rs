//! Output drivers: the cpal device stream and a deterministic headless clock.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use log::{error, info, warn};
use parking_lot::Mutex;

use super::voice::{PlaybackEvent, Voice};
use crate::error::DeviceError;

/// Live audio output on the default cpal device
pub struct DeviceOutput {
    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

impl DeviceOutput {
    /// Open the default output device and start pulling from `voice`
    pub(crate) fn open(
        voice: Arc<Mutex<Voice>>,
        events: Sender<PlaybackEvent>,
    ) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoOutputDevice)?;

        let default_config = device
            .default_output_config()
            .map_err(|e| DeviceError::OutputConfig(e.to_string()))?;

        let config = if default_config.sample_format() == SampleFormat::F32 {
            default_config
        } else {
            let ranges = device
                .supported_output_configs()
                .map_err(|e| DeviceError::OutputConfig(e.to_string()))?;
            let picked = pick_f32_config(
                ranges,
                default_config.sample_rate(),
                default_config.channels(),
            )
            .ok_or_else(|| {
                DeviceError::OutputConfig(format!(
                    "no f32 output config (default format {:?})",
                    default_config.sample_format()
                ))
            })?;
            info!(
                "Default output format is {:?}, using f32 at {} Hz",
                default_config.sample_format(),
                picked.sample_rate().0
            );
            picked
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let out_channels = channels as usize;
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    voice.lock().render(data, out_channels, sample_rate);
                },
                move |err| match err {
                    cpal::StreamError::DeviceNotAvailable => {
                        error!("Audio device lost: {}", err);
                        let _ = events.send(PlaybackEvent::DeviceLost(err.to_string()));
                    }
                    other => warn!("Audio stream error: {}", other),
                },
                None,
            )
            .map_err(|e| DeviceError::BuildStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::PlayStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            device_name,
            sample_rate,
            channels,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Choose an f32 config, preferring ranges that cover `rate` and then
/// ones with `channels`. Falls back to a range's maximum rate.
fn pick_f32_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    rate: SampleRate,
    channels: u16,
) -> Option<SupportedStreamConfig> {
    ranges
        .into_iter()
        .filter(|range| range.sample_format() == SampleFormat::F32)
        .max_by_key(|range| {
            let covers = range.min_sample_rate() <= rate && rate <= range.max_sample_rate();
            (covers, range.channels() == channels)
        })
        .map(|range| {
            if range.min_sample_rate() <= rate && rate <= range.max_sample_rate() {
                range.with_sample_rate(rate)
            } else {
                range.with_max_sample_rate()
            }
        })
}

/// Output driven by explicit time steps instead of a device clock.
///
/// Renders into a scratch buffer exactly as a device callback would, so
/// end-of-stream and loop notifications follow the same path.
pub struct HeadlessOutput {
    voice: Arc<Mutex<Voice>>,
    sample_rate: u32,
    channels: usize,
    scratch: Vec<f32>,
    /// Fractional frames carried between steps
    carry: f64,
}

impl HeadlessOutput {
    pub(crate) fn new(voice: Arc<Mutex<Voice>>, sample_rate: u32, channels: u16) -> Self {
        Self {
            voice,
            sample_rate: sample_rate.max(1),
            channels: channels.max(1) as usize,
            scratch: Vec::new(),
            carry: 0.0,
        }
    }

    /// Render `seconds` worth of output; returns the number of frames pulled
    pub fn advance(&mut self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        self.carry += seconds * self.sample_rate as f64;
        let frames = self.carry.floor() as usize;
        self.carry -= frames as f64;

        self.scratch.resize(frames * self.channels, 0.0);
        self.voice
            .lock()
            .render(&mut self.scratch, self.channels, self.sample_rate);
        frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::SupportedBufferSize;

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn test_pick_f32_config_when_default_is_integer() {
        // Typical ALSA device: i16 default, f32 also offered
        let ranges = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(1, 8000, 96000, SampleFormat::F32),
            range(2, 8000, 96000, SampleFormat::F32),
        ];

        let config = pick_f32_config(ranges, SampleRate(48000), 2).unwrap();

        assert_eq!(config.sample_format(), SampleFormat::F32);
        assert_eq!(config.sample_rate(), SampleRate(48000));
        assert_eq!(config.channels(), 2);
    }

    #[test]
    fn test_pick_f32_config_outside_default_rate_uses_max() {
        let ranges = vec![range(2, 8000, 22050, SampleFormat::F32)];

        let config = pick_f32_config(ranges, SampleRate(48000), 2).unwrap();
        assert_eq!(config.sample_rate(), SampleRate(22050));
    }

    #[test]
    fn test_pick_f32_config_none_without_f32() {
        let ranges = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(2, 8000, 96000, SampleFormat::U8),
        ];

        assert!(pick_f32_config(ranges, SampleRate(48000), 2).is_none());
    }
}
