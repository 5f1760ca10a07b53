//! Error types for the trainer pipeline.

use thiserror::Error;
use tripcost_model::ModelError;

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// Required environment configuration is missing
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote store returned no usable rows
    #[error("no training data available: {0}")]
    DataUnavailable(String),

    /// Transport-level failure talking to the remote store
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The metrics insert was rejected; propagated with no retry
    #[error("metrics insert rejected with status {status}: {body}")]
    RemoteWrite { status: u16, body: String },

    /// Preprocessing or model evaluation failure
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Training-time invariant violation
    #[error("training error: {0}")]
    Training(String),

    /// I/O failure writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON handling failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for trainer operations.
pub type Result<T> = std::result::Result<T, TrainerError>;
