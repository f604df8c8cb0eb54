use std::io;
use thiserror::Error;

/// Errors produced by the polycube engine and its generation stores.
#[derive(Debug, Error)]
pub enum PolycubeError {
    /// An axis/side pair outside the six grower directions. Indicates a logic bug.
    #[error("invalid direction: axis {axis}, positive {positive}")]
    InvalidDirection { axis: usize, positive: bool },

    /// Reading or writing a generation failed. Nothing was marked complete.
    #[error("generation store unavailable: {0}")]
    StoreUnavailable(#[from] io::Error),

    /// Stored data for a generation could not be decoded or failed validation.
    #[error("generation {n} is corrupt: {reason}")]
    CorruptGeneration { n: usize, reason: String },

    /// The status manifest of a store could not be decoded.
    #[error("store manifest is corrupt: {0}")]
    CorruptManifest(String),

    #[error("generation {0} has no stored data")]
    MissingGeneration(usize),

    #[error("generation {0} is not complete")]
    GenerationNotComplete(usize),

    #[error("invalid target generation {0}")]
    InvalidTarget(usize),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}

pub type Result<T> = std::result::Result<T, PolycubeError>;
