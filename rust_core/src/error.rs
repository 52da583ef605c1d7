//! Error types for the forecasting engine.

use crate::models::Sport;
use thiserror::Error;

/// Errors raised by the rating, prediction, grading and calibration layers.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A rating update produced NaN or infinity. Treated as fatal for the run.
    #[error("non-finite rating for {team_id}: {value}")]
    NonFiniteRating {
        /// Team whose rating went bad.
        team_id: String,
        /// The offending value.
        value: f64,
    },

    /// Team referenced by a game is not in the rating store.
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    /// A hyperparameter is outside its legal range.
    #[error("invalid parameter {name}: {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Cartesian product of the calibration grid exceeds the configured bound.
    #[error("calibration grid has {size} candidates (limit {limit})")]
    GridTooLarge {
        /// Number of candidates the grid would produce.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A calibration grid axis has no values.
    #[error("calibration grid axis {0} is empty")]
    EmptyGridAxis(&'static str),

    /// A game or persisted document belongs to a different sport than requested.
    #[error("sport mismatch: expected {expected}, found {found}")]
    SportMismatch {
        /// Sport the caller asked for.
        expected: Sport,
        /// Sport on the game or document.
        found: Sport,
    },

    /// Could not build the calibration worker pool.
    #[error("worker pool: {0}")]
    WorkerPool(String),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(String),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ForecastError>;
