//! Frequency-domain snapshots of the live tap.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::params::AnalyzerConfig;

/// Largest value a frequency bin can take
pub const MAX_BIN_VALUE: f32 = 255.0;

/// Windowed FFT turning time-domain samples into byte-scaled magnitude bins.
///
/// Magnitudes are normalised by the FFT size, converted to decibels and
/// mapped linearly from `[min_decibels, max_decibels]` onto `[0, 255]`.
pub struct Spectrum {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    min_decibels: f32,
    max_decibels: f32,
}

impl Spectrum {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            window: (0..size).map(|i| hann_window(i, size)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn bin_count(&self) -> usize {
        self.window.len() / 2
    }

    /// Transform `samples` (length `fft_size`) into `bins` (length `fft_size / 2`)
    pub fn process(&mut self, samples: &[f32], bins: &mut [f32]) {
        let size = self.fft_size();

        // Apply Hann window
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let range = self.max_decibels - self.min_decibels;
        for (bin, value) in bins.iter_mut().zip(&self.buffer[..self.bin_count()]) {
            let magnitude = value.norm() / size as f32;
            let decibels = 20.0 * magnitude.max(f32::MIN_POSITIVE).log10();
            let scaled = (decibels - self.min_decibels) / range * MAX_BIN_VALUE;
            *bin = scaled.clamp(0.0, MAX_BIN_VALUE).floor();
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_silence_maps_to_zero_bins() {
        let config = AnalyzerConfig::default();
        let mut spectrum = Spectrum::new(&config);
        let mut bins = vec![1.0; config.bin_count()];

        spectrum.process(&vec![0.0; config.fft_size], &mut bins);

        assert!(bins.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let config = AnalyzerConfig::default();
        let mut spectrum = Spectrum::new(&config);
        let size = config.fft_size;

        // Exactly 64 cycles per window lands on bin 64
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * 64.0 * i as f32 / size as f32).sin())
            .collect();
        let mut bins = vec![0.0; config.bin_count()];
        spectrum.process(&samples, &mut bins);

        assert_eq!(bins[64], MAX_BIN_VALUE);
        assert!(bins[..10].iter().all(|&b| b < 50.0));
        assert!(bins[400] < 50.0);
    }
}
