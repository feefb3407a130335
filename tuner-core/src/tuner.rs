//! # Tuner Pipeline
//!
//! Ties the stages together for one stream session:
//! window → spectral analysis → harmonic product spectrum → note mapping → history.
//!
//! The note history lives here too: every [`PitchResult`] carries the
//! history's majority as `stable_note`, so callers never keep their own.
//!
//! A [`Tuner`] is built once per session. All of its buffers are allocated in
//! [`Tuner::new`]; [`Tuner::process_block`] only computes, so it is safe to
//! call from a real-time audio callback.

use tracing::{debug, info};

use crate::config::TunerConfig;
use crate::error::TunerError;
use crate::fft::SpectralAnalyzer;
use crate::history::NoteHistory;
use crate::mapping::{EqualTemperedMapper, NoteMapper, ProfileMapper};
use crate::pitch::HpsEngine;
use crate::tuning;
use crate::window::SlidingWindow;
use crate::{Detection, PitchResult, StreamStatus};

/// How detected frequencies are turned into note names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingMode {
    /// Snap to the nearest string of a named tuning profile
    Profile(String),
    /// Name the nearest equal-tempered semitone
    EqualTempered,
}

impl MappingMode {
    fn build_mapper(&self, config: &TunerConfig) -> Box<dyn NoteMapper> {
        match self {
            MappingMode::Profile(name) => Box::new(ProfileMapper::new(tuning::lookup(name))),
            MappingMode::EqualTempered => Box::new(EqualTemperedMapper::new(config.concert_pitch)),
        }
    }
}

/// The complete pitch-estimation pipeline for one stream session.
pub struct Tuner {
    config: TunerConfig,
    window: SlidingWindow,
    analyzer: SpectralAnalyzer,
    hps: HpsEngine,
    mapper: Box<dyn NoteMapper>,
    history: NoteHistory,
}

impl std::fmt::Debug for Tuner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tuner")
            .field("config", &self.config)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl Tuner {
    /// Validates `config` and allocates every buffer the session needs.
    pub fn new(config: TunerConfig, mode: MappingMode) -> Result<Self, TunerError> {
        config.validate()?;
        info!(
            sample_rate = config.sample_rate,
            window_size = config.window_size,
            window_step = config.window_step,
            mode = ?mode,
            "creating tuner"
        );

        Ok(Self {
            window: SlidingWindow::new(config.window_size),
            analyzer: SpectralAnalyzer::new(&config),
            hps: HpsEngine::new(&config),
            mapper: mode.build_mapper(&config),
            history: NoteHistory::default(),
            config,
        })
    }

    /// Processes one block from the audio stream.
    ///
    /// # Arguments
    /// * `block` - Mono samples, at most `window_size` of them
    /// * `status` - Stream status delivered with the block
    ///
    /// # Returns
    /// * `Ok(Detection::Skipped(_))` - Faulty status; the window is left untouched
    /// * `Ok(Detection::NoPitch(_))` - Too quiet, or nothing left after gating
    /// * `Ok(Detection::Pitch(_))` - The nearest note to the detected fundamental
    /// * `Err(TunerError::BlockTooLarge)` - `block` does not fit the window
    pub fn process_block(&mut self, block: &[f32], status: StreamStatus) -> Result<Detection, TunerError> {
        if status.is_fault() {
            debug!(?status, "skipping block");
            return Ok(Detection::Skipped(status));
        }

        let samples = self.window.ingest(block)?;
        let frequency = match self
            .analyzer
            .analyze(samples)
            .and_then(|spectrum| self.hps.estimate(spectrum))
        {
            Ok(frequency) => frequency,
            Err(reason) => return Ok(Detection::NoPitch(reason)),
        };

        let nearest = self.mapper.nearest(frequency);
        self.history.record(nearest.label.as_str());
        debug!(frequency, note = %nearest.label, "pitch detected");

        Ok(Detection::Pitch(PitchResult {
            note: nearest.label,
            detected_frequency: frequency,
            reference_frequency: nearest.frequency,
            stable_note: self.history.majority().map(str::to_string),
        }))
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn window(&self) -> &[f32] {
        self.window.samples()
    }

    pub fn history(&self) -> &NoteHistory {
        &self.history
    }
}
