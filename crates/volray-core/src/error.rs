//! Error types for volray.

use thiserror::Error;

/// The main error type for volray data-model operations.
#[derive(Error, Debug)]
pub enum VolrayError {
    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// An extent whose upper index lies below its lower index.
    #[error("invalid extent {0:?}: upper index below lower index")]
    InvalidExtent([i32; 6]),

    /// A component count of zero.
    #[error("data array '{0}' must have at least one component")]
    ZeroComponents(String),

    /// An upstream field source failed to produce its output.
    #[error("upstream update failed: {0}")]
    UpdateFailed(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for volray data-model operations.
pub type Result<T> = std::result::Result<T, VolrayError>;
