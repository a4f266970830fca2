//! Error types for loci.

use thiserror::Error;

/// Errors that can occur during index construction, querying and persistence.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// I/O error (file operations, stream reads/writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Format error (invalid magic bytes, version mismatch, truncated data)
    #[error("format error: {0}")]
    Format(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for loci operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
