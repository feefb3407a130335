//! # Pitch Detection Module
//!
//! Harmonic Product Spectrum (HPS) estimation of the fundamental frequency.
//!
//! A periodic tone puts energy at f, 2f, 3f, ... Downsampling the spectrum by
//! h moves the h-th harmonic onto the fundamental's bin, so multiplying the
//! downsampled copies together reinforces the fundamental and suppresses the
//! octave errors a plain peak search makes on harmonic-rich signals.
//!
//! ## Stages
//! - Linear interpolation of the spectrum by `num_hps` for a finer peak search
//! - Normalization to unit Euclidean norm
//! - Harmonic folding with early stop once the product runs out of energy
//! - Peak extraction and conversion back to Hz

use tracing::trace;

use crate::NoPitchReason;
use crate::config::TunerConfig;

/// Linearly interpolates `spectrum` onto a grid `factor` times finer.
///
/// Position `t` of the output samples the input at bin `t / factor`. Positions
/// past the last bin repeat the last value.
pub fn interpolate_into(spectrum: &[f64], factor: usize, out: &mut Vec<f64>) {
    out.clear();
    let Some(&last) = spectrum.last() else {
        return;
    };
    let factor_f = factor as f64;
    out.extend((0..spectrum.len() * factor).map(|t| {
        let position = t as f64 / factor_f;
        let lower = position as usize;
        if lower + 1 < spectrum.len() {
            let fraction = position - lower as f64;
            spectrum[lower] * (1.0 - fraction) + spectrum[lower + 1] * fraction
        } else {
            last
        }
    }));
}

/// Scales `values` to unit Euclidean norm.
///
/// Returns `false` and leaves `values` untouched if the norm is zero.
pub fn normalize(values: &mut [f64]) -> bool {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    values.iter_mut().for_each(|v| *v /= norm);
    true
}

/// Index of the largest value; the first one wins on ties, 0 for an empty slice.
pub fn peak_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Reusable HPS state for one window size.
///
/// Every buffer is sized in [`HpsEngine::new`] from the configuration, so
/// [`HpsEngine::estimate`] runs without allocating.
///
/// The product needs harmonics to reinforce. A pure sine has none: its single
/// peak is multiplied by gated-out bins, and what survives the early stop can
/// sit on a leakage sidelobe instead. Pure tones are only reliable near the
/// low strings (110 Hz is); plucked strings are harmonic-rich and read
/// correctly across the neck.
#[derive(Debug, Clone)]
pub struct HpsEngine {
    num_hps: usize,
    delta_freq: f64,
    interpolated: Vec<f64>,
    folded: Vec<f64>,
    product: Vec<f64>,
}

impl HpsEngine {
    pub fn new(config: &TunerConfig) -> Self {
        let capacity = config.spectrum_len() * config.num_hps;
        Self {
            num_hps: config.num_hps,
            delta_freq: config.delta_freq(),
            interpolated: Vec::with_capacity(capacity),
            folded: Vec::with_capacity(capacity),
            product: Vec::with_capacity(capacity),
        }
    }

    /// Estimates the fundamental frequency of a cleaned magnitude spectrum.
    ///
    /// # Arguments
    /// * `spectrum` - Denoised magnitude spectrum, bin i at `i * delta_freq` Hz
    ///
    /// # Returns
    /// * `Ok(frequency)` - Fundamental in Hz
    /// * `Err(NoPitchReason::DegenerateSpectrum)` - The spectrum carries no energy,
    ///   or the peak landed on bin 0
    pub fn estimate(&mut self, spectrum: &[f64]) -> Result<f64, NoPitchReason> {
        interpolate_into(spectrum, self.num_hps, &mut self.interpolated);
        if !normalize(&mut self.interpolated) {
            return Err(NoPitchReason::DegenerateSpectrum);
        }

        self.fold();

        let index = peak_index(&self.folded);
        let frequency = index as f64 * self.delta_freq / self.num_hps as f64;
        trace!(index, frequency, len = self.folded.len(), "hps peak");
        if index == 0 {
            return Err(NoPitchReason::DegenerateSpectrum);
        }
        Ok(frequency)
    }

    #[cfg(test)]
    fn folded(&self) -> &[f64] {
        &self.folded
    }

    fn fold(&mut self) {
        self.folded.clear();
        self.folded.extend_from_slice(&self.interpolated);

        let len = self.interpolated.len();
        for h in 1..=self.num_hps {
            let kept = len.div_ceil(h);
            self.product.clear();
            self.product.extend(
                self.folded[..kept]
                    .iter()
                    .zip(self.interpolated.iter().step_by(h))
                    .map(|(acc, harmonic)| acc * harmonic),
            );
            // Past the last harmonic with energy: keep what we have.
            if self.product.iter().all(|&v| v == 0.0) {
                trace!(h, "harmonic product vanished");
                break;
            }
            std::mem::swap(&mut self.folded, &mut self.product);
        }
    }
}
