//! Error types for the tuner core

use thiserror::Error;

/// Errors returned to the caller. Signal-level conditions (silence, a gated-out
/// spectrum, a faulty stream block) are not errors; they are reported through
/// [`Detection`](crate::Detection).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// The configuration cannot drive the pipeline
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A block longer than the analysis window was passed to ingest
    #[error("block of {block} samples does not fit a window of {window} samples")]
    BlockTooLarge { block: usize, window: usize },
}
