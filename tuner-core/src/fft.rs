//! # Fast Fourier Transform (FFT) Module
//!
//! Turns the current analysis window into a clean magnitude spectrum.
//!
//! ## Stages
//! 1. Power gate: windows that are too quiet never reach the FFT
//! 2. Hann windowing for reduced spectral leakage
//! 3. Forward FFT, keeping the non-negative frequencies
//! 4. Mains hum and rumble suppression
//! 5. Adaptive noise gate, one threshold per octave band
//!
//! The FFT plan, the Hann window and every buffer are created once in
//! [`SpectralAnalyzer::new`], so per-block analysis does not allocate.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use tracing::debug;

use crate::NoPitchReason;
use crate::config::TunerConfig;

/// Normalized signal power: squared Euclidean norm divided by the sample count.
pub fn signal_power(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    energy / samples.len() as f64
}

/// Builds a symmetric Hann window of length `n`.
///
/// The window is zero at both ends and reaches 1.0 in the middle, which is
/// what tapers the block edges and reduces spectral leakage.
pub fn hann_window(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let n_minus_1 = (n - 1) as f64;
            (0..n)
                .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n_minus_1).cos())
                .collect()
        }
    }
}

/// Zeroes every bin below `cutoff_hz`.
///
/// Removes mains hum and sub-audible rumble before the noise gate sees them.
pub fn suppress_mains_hum(spectrum: &mut [f64], delta_freq: f64, cutoff_hz: f64) {
    let bins = ((cutoff_hz / delta_freq) as usize).min(spectrum.len());
    spectrum[..bins].fill(0.0);
}

/// Applies the adaptive white-noise gate band by band.
///
/// For every band between two consecutive edges the RMS magnitude is computed,
/// and bins that do not exceed `threshold * rms` are zeroed. A bin that stands
/// out in a quiet band survives even if it would be lost under a global threshold.
///
/// # Arguments
/// * `spectrum` - Magnitude spectrum (modified in-place)
/// * `band_edges` - Ascending band edges in Hz
/// * `delta_freq` - Frequency step between bins in Hz
/// * `threshold` - Fraction of the band RMS a bin must exceed
pub fn gate_octave_bands(spectrum: &mut [f64], band_edges: &[f64], delta_freq: f64, threshold: f64) {
    for edges in band_edges.windows(2) {
        let start = (edges[0] / delta_freq) as usize;
        let end = ((edges[1] / delta_freq) as usize).min(spectrum.len());
        if start >= end {
            continue;
        }

        let band = &mut spectrum[start..end];
        let mean_square = band.iter().map(|m| m * m).sum::<f64>() / band.len() as f64;
        let floor = threshold * mean_square.sqrt();
        for magnitude in band.iter_mut() {
            if *magnitude <= floor {
                *magnitude = 0.0;
            }
        }
    }
}

/// Power gate, windowing, FFT and denoising for one analysis window.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    hann: Vec<f64>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    magnitudes: Vec<f64>,
    delta_freq: f64,
    power_threshold: f64,
    hum_cutoff: f64,
    octave_bands: Vec<f64>,
    white_noise_threshold: f64,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("window_size", &self.hann.len())
            .field("delta_freq", &self.delta_freq)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Plans the FFT and allocates all buffers for `config.window_size` samples.
    pub fn new(config: &TunerConfig) -> Self {
        let window_size = config.window_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        Self {
            fft,
            hann: hann_window(window_size),
            buffer: vec![Complex::default(); window_size],
            scratch,
            magnitudes: vec![0.0; config.spectrum_len()],
            delta_freq: config.delta_freq(),
            power_threshold: config.power_threshold,
            hum_cutoff: config.hum_cutoff,
            octave_bands: config.octave_bands.clone(),
            white_noise_threshold: config.white_noise_threshold,
        }
    }

    /// Runs the full analysis on the current window.
    ///
    /// # Arguments
    /// * `samples` - The analysis window (must be exactly `window_size` samples)
    ///
    /// # Returns
    /// * `Ok(spectrum)` - Denoised magnitude spectrum of `window_size / 2` bins
    /// * `Err(NoPitchReason::InsufficientSignal)` - Window power is below the threshold
    pub fn analyze(&mut self, samples: &[f32]) -> Result<&[f64], NoPitchReason> {
        debug_assert_eq!(samples.len(), self.hann.len());

        let power = signal_power(samples);
        if power < self.power_threshold {
            debug!(power, "signal power below threshold");
            return Err(NoPitchReason::InsufficientSignal);
        }

        self.magnitude_spectrum(samples);
        suppress_mains_hum(&mut self.magnitudes, self.delta_freq, self.hum_cutoff);
        self.denoise_in_place();
        Ok(&self.magnitudes)
    }

    /// Re-applies the octave-band gate to the last spectrum.
    pub fn denoise_in_place(&mut self) {
        gate_octave_bands(
            &mut self.magnitudes,
            &self.octave_bands,
            self.delta_freq,
            self.white_noise_threshold,
        );
    }

    #[cfg(test)]
    fn spectrum(&self) -> &[f64] {
        &self.magnitudes
    }

    fn magnitude_spectrum(&mut self, samples: &[f32]) {
        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(samples).zip(&self.hann) {
            *slot = Complex::new(f64::from(sample) * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (magnitude, c) in self.magnitudes.iter_mut().zip(&self.buffer) {
            *magnitude = c.norm(); // .norm() is sqrt(re^2 + im^2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f64, sample_rate: f64, len: usize, amplitude: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin()) as f32)
            .collect()
    }

    #[test]
    fn power_of_full_scale_square_is_one() {
        assert_relative_eq!(signal_power(&[1.0, -1.0, 1.0, -1.0]), 1.0);
        assert_eq!(signal_power(&[]), 0.0);
    }

    #[test]
    fn hann_window_is_symmetric_and_tapered() {
        let w = hann_window(9);
        assert_eq!(w.len(), 9);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[8], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[4], 1.0);
        for i in 0..9 {
            assert_relative_eq!(w[i], w[8 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn hum_suppression_zeroes_low_bins() {
        let mut spectrum = vec![1.0; 100];
        suppress_mains_hum(&mut spectrum, 1.0, 62.0);
        assert!(spectrum[..62].iter().all(|&m| m == 0.0));
        assert!(spectrum[62..].iter().all(|&m| m == 1.0));

        let mut short = vec![1.0; 10];
        suppress_mains_hum(&mut short, 1.0, 62.0);
        assert!(short.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn gate_keeps_bins_that_stand_out_in_their_band() {
        // Band 0..10 holds one strong bin, band 10..20 only low-level noise.
        let mut spectrum = vec![0.01; 20];
        spectrum[4] = 5.0;
        spectrum[15] = 0.03;
        gate_octave_bands(&mut spectrum, &[0.0, 10.0, 20.0], 1.0, 0.2);

        assert_eq!(spectrum[4], 5.0);
        assert!(spectrum[..10].iter().enumerate().all(|(i, &m)| i == 4 || m == 0.0));
        // In the quiet band the local noise floor is low, so the small peak survives.
        assert_eq!(spectrum[15], 0.03);
    }

    #[test]
    fn gate_clips_last_band_and_skips_empty_ones() {
        let mut spectrum = vec![1.0; 30];
        gate_octave_bands(&mut spectrum, &[0.0, 0.5, 100.0], 1.0, 0.2);
        assert!(spectrum.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn gating_is_idempotent() {
        let config = TunerConfig::default();
        let mut analyzer = SpectralAnalyzer::new(&config);
        let mut samples = sine(196.0, 48_000.0, config.window_size, 0.3);
        for (i, s) in samples.iter_mut().enumerate() {
            // Deterministic broadband hiss on top of the tone.
            *s += 0.01 * (((i * 7919) % 1000) as f32 / 1000.0 - 0.5);
        }

        let first = analyzer.analyze(&samples).unwrap().to_vec();
        analyzer.denoise_in_place();
        suppress_mains_hum(&mut analyzer.magnitudes, config.delta_freq(), config.hum_cutoff);
        assert_eq!(analyzer.spectrum(), first.as_slice());
    }

    #[test]
    fn silence_is_gated_before_the_fft() {
        let config = TunerConfig::default();
        let mut analyzer = SpectralAnalyzer::new(&config);
        let silence = vec![0.0; config.window_size];
        assert_eq!(analyzer.analyze(&silence), Err(NoPitchReason::InsufficientSignal));
    }

    #[test]
    fn tone_energy_lands_in_its_bin() {
        let config = TunerConfig::default();
        let mut analyzer = SpectralAnalyzer::new(&config);
        let samples = sine(440.0, 48_000.0, config.window_size, 0.5);
        let spectrum = analyzer.analyze(&samples).unwrap();

        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 440);
        assert!(spectrum[..62].iter().all(|&m| m == 0.0));
    }
}
