//! Decoded audio buffers and the symphonia decode path.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Immutable decoded audio: interleaved f32 samples plus format.
///
/// Replaced wholesale when a new file is loaded, never mutated.
#[derive(Debug, Clone)]
pub struct AudioSource {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioSource {
    /// Wrap already-decoded interleaved samples
    pub fn from_interleaved(
        samples: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::UnknownSampleRate);
        }
        if channels == 0 {
            return Err(DecodeError::UnsupportedFormat(
                "zero audio channels".to_string(),
            ));
        }
        let mut samples = samples;
        // Drop a trailing partial frame
        samples.truncate(samples.len() - samples.len() % channels as usize);
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Read and decode a file, using its extension as a format hint
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let bytes = fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::decode(bytes, extension)
    }

    /// Decode an in-memory byte stream (any container/codec symphonia knows)
    pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let declared_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut channels: Option<u16> = None;
        let mut sample_rate = declared_rate;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    // Nothing decoded yet means the stream itself is unusable
                    if samples.is_empty() {
                        return Err(DecodeError::UnsupportedFormat(e.to_string()));
                    }
                    warn!("Stopping decode at unreadable packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(DecodeError::UnsupportedFormat(e.to_string())),
            };

            let spec = *decoded.spec();
            if channels.is_none() {
                channels = Some(spec.channels.count() as u16);
                sample_rate = sample_rate.or(Some(spec.rate));
            }

            // (Re)allocate when a packet outgrows the buffer
            let needed = decoded.capacity() * spec.channels.count();
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(ref mut buf) = sample_buf {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        let sample_rate = sample_rate.ok_or(DecodeError::UnknownSampleRate)?;
        let channels = channels.ok_or(DecodeError::Empty)?;
        Self::from_interleaved(samples, channels, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Total duration in seconds
    pub fn duration_s(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Write the frame at fractional position `pos` into `out`, linearly
    /// interpolated and mapped onto `out.len()` channels. Returns the mono
    /// mix of the written frame.
    pub fn write_frame(&self, pos: f64, out: &mut [f32]) -> f32 {
        let last = self.frames() - 1;
        let index = (pos.max(0.0).floor() as usize).min(last);
        let next = (index + 1).min(last);
        let frac = (pos - index as f64).clamp(0.0, 1.0) as f32;

        let channels = self.channels as usize;
        let sample = |frame: usize, channel: usize| self.samples[frame * channels + channel];
        let lerp = |channel: usize| {
            let a = sample(index, channel);
            a + (sample(next, channel) - a) * frac
        };

        let mono = (0..channels).map(lerp).sum::<f32>() / channels as f32;

        if out.len() == channels {
            for (channel, slot) in out.iter_mut().enumerate() {
                *slot = lerp(channel);
            }
        } else {
            out.fill(mono);
        }

        mono
    }
}

/// Decode `path` on a background thread and hand the result to `on_done`.
///
/// Decoding is the only long-running operation of the pipeline; running it
/// off the render thread keeps ticks flowing while a file loads.
pub fn decode_in_background<F>(path: PathBuf, on_done: F) -> thread::JoinHandle<()>
where
    F: FnOnce(PathBuf, Result<AudioSource, DecodeError>) + Send + 'static,
{
    thread::spawn(move || {
        info!("Decoding {}", path.display());
        let result = AudioSource::open(&path);
        match &result {
            Ok(source) => info!(
                "Decoded {}: {:.2}s, {} ch @ {}Hz",
                path.display(),
                source.duration_s(),
                source.channels(),
                source.sample_rate()
            ),
            Err(e) => warn!("Failed to decode {}: {}", path.display(), e),
        }
        on_done(path, result);
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a sine tone as 16-bit WAV bytes
    pub(crate) fn wav_bytes(seconds: f32, sample_rate: u32, channels: u16, hz: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (seconds * sample_rate as f32) as usize;
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let value = (t * hz * std::f32::consts::TAU).sin() * 0.5;
                for _ in 0..channels {
                    writer
                        .write_sample((value * i16::MAX as f32) as i16)
                        .unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav_duration_and_format() {
        let bytes = wav_bytes(2.0, 8000, 2, 440.0);
        let source = AudioSource::decode(bytes, Some("wav")).unwrap();

        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 8000);
        assert_eq!(source.frames(), 16000);
        assert!((source.duration_s() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = AudioSource::decode(vec![0x13; 4096], None);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = AudioSource::open(Path::new("/nonexistent/track.wav"));
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }

    #[test]
    fn test_from_interleaved_rejects_empty() {
        assert!(matches!(
            AudioSource::from_interleaved(Vec::new(), 1, 44100),
            Err(DecodeError::Empty)
        ));
        assert!(matches!(
            AudioSource::from_interleaved(vec![0.0; 8], 2, 0),
            Err(DecodeError::UnknownSampleRate)
        ));
    }

    #[test]
    fn test_write_frame_interpolates_and_maps_channels() {
        let source = AudioSource::from_interleaved(vec![0.0, 1.0, 2.0, 3.0], 1, 4).unwrap();

        let mut stereo = [0.0; 2];
        let mono = source.write_frame(1.5, &mut stereo);
        assert_eq!(mono, 1.5);
        assert_eq!(stereo, [1.5, 1.5]);

        // Past the end clamps to the last frame
        let mut out = [0.0; 1];
        source.write_frame(10.0, &mut out);
        assert_eq!(out, [3.0]);
    }

    #[test]
    fn test_decode_in_background_reports_failure() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        decode_in_background(PathBuf::from("/nonexistent/song.mp3"), move |path, result| {
            let _ = tx.send((path, result.is_err()));
        })
        .join()
        .unwrap();

        let (path, failed) = rx.recv().unwrap();
        assert_eq!(path, PathBuf::from("/nonexistent/song.mp3"));
        assert!(failed);
    }
}
