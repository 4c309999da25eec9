//! Error types for drift monitoring

use thiserror::Error;

/// Errors surfaced by the monitoring core.
///
/// `InsufficientData` and `AlreadyRunning` are expected outcomes of a
/// monitoring cycle rather than faults; the scheduler handles every variant
/// locally and none of them stops the timer cadence or the serving path.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("insufficient data: {have} of {need} required samples")]
    InsufficientData { have: usize, need: usize },

    #[error("schema mismatch: window record missing feature '{feature}'")]
    SchemaMismatch { feature: String },

    #[error("analysis already running")]
    AlreadyRunning,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
