//! Spectral analysis configuration.

use std::ops::Range;

use crate::error::ConfigError;

/// Bin count the band layout is expressed in (fft_size 2048).
pub const REFERENCE_BIN_COUNT: usize = 1024;

/// Spectral analyzer configuration with band layout
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFT window size (must be power of 2); yields `fft_size / 2` bins
    /// Default: 2048 (= 1024 bins)
    pub fft_size: usize,

    /// Exponential smoothing factor α (weight of the previous value)
    /// Formula: smoothed = smoothed * α + raw * (1 - α)
    pub smoothing: f32,

    /// Magnitude mapped to bin value 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to bin value 255 (dBFS)
    pub max_decibels: f32,

    /// Bass bins at reference resolution (1024 bins)
    pub bass_bins: Range<usize>,

    /// Mid bins at reference resolution
    pub mid_bins: Range<usize>,

    /// Treble bins at reference resolution
    pub treble_bins: Range<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            bass_bins: 0..10,
            mid_bins: 10..100,
            treble_bins: 100..256,
        }
    }
}

impl AnalyzerConfig {
    /// Number of frequency bins produced per snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Scale a reference-resolution range onto the actual bin count
    fn scaled(&self, range: &Range<usize>) -> Range<usize> {
        let bins = self.bin_count();
        let scale = |bin: usize| (bin * bins / REFERENCE_BIN_COUNT).min(bins);
        scale(range.start)..scale(range.end)
    }

    /// Bass bin range at the configured FFT size
    pub fn bass_range(&self) -> Range<usize> {
        self.scaled(&self.bass_bins)
    }

    /// Mid bin range at the configured FFT size
    pub fn mid_range(&self) -> Range<usize> {
        self.scaled(&self.mid_bins)
    }

    /// Treble bin range at the configured FFT size
    pub fn treble_range(&self) -> Range<usize> {
        self.scaled(&self.treble_bins)
    }

    /// Validate configuration (FFT size must be power of 2, bands non-empty, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(ConfigError::Smoothing(self.smoothing));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::DecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        for (name, range) in [
            ("bass", self.bass_range()),
            ("mid", self.mid_range()),
            ("treble", self.treble_range()),
        ] {
            if range.is_empty() {
                return Err(ConfigError::EmptyBand(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band_layout() {
        let config = AnalyzerConfig::default();

        assert_eq!(config.bin_count(), 1024);
        assert_eq!(config.bass_range(), 0..10);
        assert_eq!(config.mid_range(), 10..100);
        assert_eq!(config.treble_range(), 100..256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_band_layout_scales_with_fft_size() {
        let config = AnalyzerConfig {
            fft_size: 1024,
            ..Default::default()
        };

        // 512 bins: every boundary halves
        assert_eq!(config.bass_range(), 0..5);
        assert_eq!(config.mid_range(), 5..50);
        assert_eq!(config.treble_range(), 50..128);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let not_pow2 = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert_eq!(not_pow2.validate(), Err(ConfigError::FftSize(1000)));

        let smoothing = AnalyzerConfig {
            smoothing: 1.0,
            ..Default::default()
        };
        assert_eq!(smoothing.validate(), Err(ConfigError::Smoothing(1.0)));

        // 32 bins: bass collapses to 0..0
        let tiny = AnalyzerConfig {
            fft_size: 64,
            ..Default::default()
        };
        assert_eq!(tiny.validate(), Err(ConfigError::EmptyBand("bass")));
    }
}
