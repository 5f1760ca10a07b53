//! Error types for the model crate

use thiserror::Error;

/// Errors raised by preprocessing and model evaluation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The fetched result set contained no rows
    #[error("no training data available: {0}")]
    EmptyTable(String),

    /// A required column is absent from the input table
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A column value could not be interpreted as the expected type
    #[error("invalid value in column {column}, row {row}")]
    InvalidValue { column: String, row: usize },

    /// Fit found none of the recognized feature columns in the input
    #[error("no recognized feature columns in the input table")]
    NoFeatureColumns,

    /// Transform called on a pipeline that was never fitted
    #[error("feature pipeline is not fitted (call fit_transform first)")]
    NotFitted,

    /// Input width does not match the fitted model
    #[error("feature size mismatch: expected {expected}, got {actual}")]
    FeatureSizeMismatch { expected: usize, actual: usize },

    /// I/O error while writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
