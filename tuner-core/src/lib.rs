// tuner-core/src/lib.rs

//! The core logic for the HPS guitar tuner.
//! This crate is responsible for buffering audio, estimating the
//! fundamental with a harmonic product spectrum and naming the note.
//! It is completely headless and contains no GUI code.

#[cfg(feature = "capture")]
pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod history;
pub mod mapping;
pub mod pitch;
pub mod tuner;
pub mod tuning;
pub mod window;

use std::fmt;

use serde::Serialize;

pub use config::TunerConfig;
pub use error::TunerError;
pub use tuner::{MappingMode, Tuner};

/// A note decision for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchResult {
    /// The name of the nearest note.
    pub note: String,
    /// The detected fundamental in Hz.
    pub detected_frequency: f64,
    /// The frequency the nearest note should have, in Hz.
    pub reference_frequency: f64,
    /// The note most recent windows agree on, including this one.
    pub stable_note: Option<String>,
}

impl PitchResult {
    /// The deviation from the reference note in cents.
    pub fn cents_deviation(&self) -> f64 {
        tuning::calculate_cents_deviation(self.detected_frequency, self.reference_frequency)
    }
}

impl fmt::Display for PitchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.1}/{:.1}",
            self.note, self.detected_frequency, self.reference_frequency
        )
    }
}

/// Why a window produced no note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoPitchReason {
    /// Signal power is below the configured threshold
    InsufficientSignal,
    /// Noise gating removed all energy, or the peak fell on 0 Hz
    DegenerateSpectrum,
}

/// Status reported by the audio stream alongside a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StreamStatus {
    #[default]
    Ok,
    /// The device reported an error since the previous block
    StreamError,
}

impl StreamStatus {
    pub fn is_fault(self) -> bool {
        self != StreamStatus::Ok
    }
}

/// Outcome of processing one audio block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Detection {
    Pitch(PitchResult),
    NoPitch(NoPitchReason),
    /// The block was discarded because of a stream fault; the window did not move.
    Skipped(StreamStatus),
}

impl Detection {
    pub fn pitch(&self) -> Option<&PitchResult> {
        match self {
            Detection::Pitch(result) => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detection::Pitch(result) => write!(f, "Closest note: {result}"),
            Detection::NoPitch(_) | Detection::Skipped(_) => write!(f, "Closest note: ..."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rounds_to_one_decimal() {
        let detection = Detection::Pitch(PitchResult {
            note: "E2".into(),
            detected_frequency: 82.4399,
            reference_frequency: 82.41,
            stable_note: None,
        });
        assert_eq!(detection.to_string(), "Closest note: E2 82.4/82.4");
    }

    #[test]
    fn no_pitch_has_placeholder_text() {
        let detection = Detection::NoPitch(NoPitchReason::InsufficientSignal);
        assert_eq!(detection.to_string(), "Closest note: ...");
        assert!(detection.pitch().is_none());
    }

    #[test]
    fn only_ok_status_is_healthy() {
        assert!(!StreamStatus::Ok.is_fault());
        assert!(StreamStatus::StreamError.is_fault());
    }
}
