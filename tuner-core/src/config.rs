//! # Configuration Module
//!
//! Analysis constants for the tuner. They are fixed for the lifetime of a
//! [`Tuner`](crate::tuner::Tuner): changing any of them means building a new one.

use serde::{Deserialize, Serialize};

use crate::error::TunerError;

/// Octave band edges in Hz used by the adaptive noise gate.
pub const DEFAULT_OCTAVE_BANDS: [f64; 10] = [
    50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0, 12800.0, 25600.0,
];

/// Analysis configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Sample rate of the incoming stream in Hz (default: 48000)
    pub sample_rate: u32,

    /// Length of the analysis window in samples (default: 48000)
    pub window_size: usize,

    /// Samples per incoming block, i.e. the hop between analyses (default: 12000)
    pub window_step: usize,

    /// Number of harmonic product folds, also the interpolation factor (default: 5)
    pub num_hps: usize,

    /// Normalized signal power below which no pitch is reported (default: 1e-6)
    pub power_threshold: f64,

    /// Bins below `white_noise_threshold * band RMS` are cut (default: 0.2)
    pub white_noise_threshold: f64,

    /// Reference pitch for A4 in Hz (default: 440.0)
    pub concert_pitch: f64,

    /// Everything below this frequency is zeroed before gating (default: 62.0 Hz)
    pub hum_cutoff: f64,

    /// Ascending octave band edges in Hz
    pub octave_bands: Vec<f64>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            window_size: 48_000,
            window_step: 12_000,
            num_hps: 5,
            power_threshold: 1e-6,
            white_noise_threshold: 0.2,
            concert_pitch: 440.0,
            hum_cutoff: 62.0,
            octave_bands: DEFAULT_OCTAVE_BANDS.to_vec(),
        }
    }
}

impl TunerConfig {
    /// Frequency step between two spectrum bins in Hz.
    pub fn delta_freq(&self) -> f64 {
        self.sample_rate as f64 / self.window_size as f64
    }

    /// Length of the magnitude spectrum (non-negative frequencies only).
    pub fn spectrum_len(&self) -> usize {
        self.window_size / 2
    }

    /// Checks that the constants describe a usable pipeline.
    pub fn validate(&self) -> Result<(), TunerError> {
        if self.sample_rate == 0 {
            return Err(TunerError::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.window_size < 4 {
            return Err(TunerError::InvalidConfig(format!(
                "window_size must be at least 4 samples, got {}",
                self.window_size
            )));
        }
        if self.window_step == 0 || self.window_step > self.window_size {
            return Err(TunerError::InvalidConfig(format!(
                "window_step must be in 1..={}, got {}",
                self.window_size, self.window_step
            )));
        }
        if self.num_hps == 0 {
            return Err(TunerError::InvalidConfig("num_hps must be at least 1".into()));
        }
        for (name, value) in [
            ("power_threshold", self.power_threshold),
            ("white_noise_threshold", self.white_noise_threshold),
            ("hum_cutoff", self.hum_cutoff),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TunerError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !self.concert_pitch.is_finite() || self.concert_pitch <= 0.0 {
            return Err(TunerError::InvalidConfig(format!(
                "concert_pitch must be positive, got {}",
                self.concert_pitch
            )));
        }
        if self.octave_bands.len() < 2 {
            return Err(TunerError::InvalidConfig(
                "octave_bands needs at least two edges".into(),
            ));
        }
        if self
            .octave_bands
            .windows(2)
            .any(|edges| !(edges[0] >= 0.0 && edges[0] < edges[1]))
        {
            return Err(TunerError::InvalidConfig(
                "octave_bands must be non-negative and strictly ascending".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delta_freq(), 1.0);
        assert_eq!(config.spectrum_len(), 24_000);
    }

    #[test]
    fn step_larger_than_window_is_rejected() {
        let config = TunerConfig {
            window_step: 50_000,
            ..TunerConfig::default()
        };
        assert!(matches!(config.validate(), Err(TunerError::InvalidConfig(_))));
    }

    #[test]
    fn descending_bands_are_rejected() {
        let config = TunerConfig {
            octave_bands: vec![100.0, 50.0],
            ..TunerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_folds_are_rejected() {
        let config = TunerConfig {
            num_hps: 0,
            ..TunerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
