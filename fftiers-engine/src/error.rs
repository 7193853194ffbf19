//! Error types for tier computation

use thiserror::Error;

/// Errors raised by clustering strategies and the orchestrator
///
/// Strategy errors never reach callers directly: the orchestrator logs them
/// and falls through to the next strategy. Only `AllStrategiesFailed`
/// escapes `compute_tiers`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TierError {
    /// Requested tier count is unusable (zero)
    #[error("Invalid tier count: {0}")]
    InvalidTierCount(usize),

    /// Fewer samples than mixture components
    #[error("Insufficient samples: {samples} samples for {k} components")]
    InsufficientSamples { samples: usize, k: usize },

    /// NaN or infinite value in input or intermediate computation
    #[error("Non-finite value: {0}")]
    NonFiniteValue(String),

    /// Input cannot be modelled (e.g. zero rank range)
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Unrecognized scoring format token
    #[error("Unknown scoring format: {0}")]
    UnknownFormat(String),

    /// `predict` called before a successful `fit`
    #[error("Model not fitted")]
    NotFitted,

    /// Every configured strategy returned an error
    #[error("All tier strategies failed: {0}")]
    AllStrategiesFailed(String),
}

pub type TierResult<T> = Result<T, TierError>;
