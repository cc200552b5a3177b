//! Band energy extraction and exponential smoothing.

use std::ops::Range;

use super::fft::{Spectrum, MAX_BIN_VALUE};
use crate::params::AnalyzerConfig;
use crate::playback::LiveTap;

/// Per-band energies normalised to [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergy {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Mean over every bin
    pub average: f32,
    /// Largest single bin
    pub peak: f32,
}

impl BandEnergy {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
        average: 0.0,
        peak: 0.0,
    };

    /// Measure band energies from a magnitude snapshot (values in 0..=255)
    pub fn measure(
        bins: &[f32],
        bass: Range<usize>,
        mid: Range<usize>,
        treble: Range<usize>,
    ) -> Self {
        let mean = |range: Range<usize>| {
            let range = range.start.min(bins.len())..range.end.min(bins.len());
            if range.is_empty() {
                return 0.0;
            }
            bins[range.clone()].iter().sum::<f32>() / range.len() as f32
        };

        let peak = bins.iter().copied().fold(0.0, f32::max);

        Self {
            bass: mean(bass) / MAX_BIN_VALUE,
            mid: mean(mid) / MAX_BIN_VALUE,
            treble: mean(treble) / MAX_BIN_VALUE,
            average: mean(0..bins.len()) / MAX_BIN_VALUE,
            peak: peak / MAX_BIN_VALUE,
        }
    }

    /// One exponential smoothing step toward `raw`, each channel independently
    pub fn smoothed_toward(&self, raw: &Self, alpha: f32) -> Self {
        let step = |prev: f32, next: f32| prev * alpha + next * (1.0 - alpha);
        Self {
            bass: step(self.bass, raw.bass),
            mid: step(self.mid, raw.mid),
            treble: step(self.treble, raw.treble),
            average: step(self.average, raw.average),
            peak: step(self.peak, raw.peak),
        }
    }
}

/// Pulls a frequency snapshot from the live tap once per tick and keeps
/// raw and smoothed band energies.
pub struct SpectralAnalyzer {
    config: AnalyzerConfig,
    spectrum: Spectrum,
    tap: Option<LiveTap>,
    samples: Vec<f32>,
    bins: Vec<f32>,
    raw: BandEnergy,
    smoothed: BandEnergy,
}

impl SpectralAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let spectrum = Spectrum::new(&config);
        Self {
            samples: vec![0.0; config.fft_size],
            bins: vec![0.0; config.bin_count()],
            spectrum,
            config,
            tap: None,
            raw: BandEnergy::ZERO,
            smoothed: BandEnergy::ZERO,
        }
    }

    pub fn attach_tap(&mut self, tap: LiveTap) {
        self.tap = Some(tap);
    }

    /// Release the tap handle and return to silence
    pub fn detach_tap(&mut self) {
        self.tap = None;
        self.reset();
    }

    /// Analyze one tick. Reads the tap only while `playing`; otherwise (or
    /// when the tap no longer reaches an engine) both raw and smoothed
    /// values reset to zero.
    pub fn update(&mut self, playing: bool) -> BandEnergy {
        let attached = match (&self.tap, playing) {
            (Some(tap), true) => tap.read(&mut self.samples),
            _ => false,
        };

        if !attached {
            self.reset();
            return self.smoothed;
        }

        self.spectrum.process(&self.samples, &mut self.bins);
        self.smooth_from_bins()
    }

    /// Feed a magnitude snapshot directly (values in 0..=255)
    pub fn ingest_bins(&mut self, bins: &[f32]) -> BandEnergy {
        let len = bins.len().min(self.bins.len());
        self.bins[..len].copy_from_slice(&bins[..len]);
        self.bins[len..].fill(0.0);
        self.smooth_from_bins()
    }

    fn smooth_from_bins(&mut self) -> BandEnergy {
        self.raw = BandEnergy::measure(
            &self.bins,
            self.config.bass_range(),
            self.config.mid_range(),
            self.config.treble_range(),
        );
        self.smoothed = self
            .smoothed
            .smoothed_toward(&self.raw, self.config.smoothing);
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.raw = BandEnergy::ZERO;
        self.smoothed = BandEnergy::ZERO;
    }

    pub fn raw(&self) -> BandEnergy {
        self.raw
    }

    pub fn smoothed(&self) -> BandEnergy {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PlaybackConfig;
    use crate::playback::{AudioSource, PlaybackEngine};

    fn bass_only_bins() -> Vec<f32> {
        let mut bins = vec![0.0; 1024];
        bins[..10].fill(MAX_BIN_VALUE);
        bins
    }

    #[test]
    fn test_measure_bass_only_snapshot() {
        let config = AnalyzerConfig::default();
        let energy = BandEnergy::measure(
            &bass_only_bins(),
            config.bass_range(),
            config.mid_range(),
            config.treble_range(),
        );

        assert_eq!(energy.bass, 1.0);
        assert_eq!(energy.mid, 0.0);
        assert_eq!(energy.treble, 0.0);
        assert_eq!(energy.peak, 1.0);
        assert!((energy.average - 10.0 / 1024.0).abs() < 1e-6);
    }

    #[test]
    fn test_smoothing_converges_monotonically() {
        let raw = BandEnergy {
            bass: 0.9,
            mid: 0.4,
            treble: 0.1,
            average: 0.3,
            peak: 1.0,
        };

        for alpha in [0.1, 0.5, 0.8, 0.95] {
            let mut smoothed = BandEnergy::ZERO;
            let mut last_deviation = f32::INFINITY;
            for _ in 0..400 {
                smoothed = smoothed.smoothed_toward(&raw, alpha);
                let deviation = (smoothed.bass - raw.bass).abs();
                // Allow one rounding step of slack at the f32 fixed point
                assert!(deviation <= last_deviation + 1e-6, "alpha {}", alpha);
                last_deviation = deviation;
            }
            assert!(last_deviation < 1e-5, "alpha {} stuck at {}", alpha, last_deviation);
            assert!((smoothed.peak - raw.peak).abs() < 1e-5);
        }
    }

    #[test]
    fn test_first_tick_uses_alpha_weighting() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        let energy = analyzer.ingest_bins(&bass_only_bins());

        assert_eq!(analyzer.raw().bass, 1.0);
        assert!((energy.bass - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_inactive_playback_resets_instead_of_decaying() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        for _ in 0..20 {
            analyzer.ingest_bins(&bass_only_bins());
        }
        assert!(analyzer.smoothed().bass > 0.9);

        let energy = analyzer.update(false);

        assert_eq!(energy, BandEnergy::ZERO);
        assert_eq!(analyzer.raw(), BandEnergy::ZERO);
    }

    #[test]
    fn test_update_reads_live_tap_while_playing() {
        let config = AnalyzerConfig::default();
        let mut engine = PlaybackEngine::new(&PlaybackConfig::default(), config.fft_size);
        let rate = 44100;
        // 86 Hz tone lands in bin 4 (~21.5 Hz per bin)
        let samples: Vec<f32> = (0..rate)
            .map(|i| (i as f32 * 86.0 * std::f32::consts::TAU / rate as f32).sin())
            .collect();
        engine.install(AudioSource::from_interleaved(samples, 1, rate as u32).unwrap());
        let mut output = engine.headless_output(rate as u32, 1);
        engine.play().unwrap();
        output.advance(0.1);

        let mut analyzer = SpectralAnalyzer::new(config);
        analyzer.attach_tap(engine.tap());
        analyzer.update(true);

        let raw = analyzer.raw();
        assert!(raw.bass > raw.treble);
        assert!(raw.peak > 0.9);
    }

    #[test]
    fn test_dropped_engine_reads_as_silence() {
        let config = AnalyzerConfig::default();
        let engine = PlaybackEngine::new(&PlaybackConfig::default(), config.fft_size);
        let mut analyzer = SpectralAnalyzer::new(config);
        analyzer.attach_tap(engine.tap());
        drop(engine);

        assert_eq!(analyzer.update(true), BandEnergy::ZERO);
    }
}
