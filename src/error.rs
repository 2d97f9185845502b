//! Error types for resample operations

use crate::types::ScalarKind;
use thiserror::Error;

/// Main error type for resample readers
#[derive(Error, Debug)]
pub enum ResampleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reader setup is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Declared shape disagrees with the payload length
    #[error("Size mismatch: expected {expected} bytes of voxel data, found {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Unsupported element type: {0}")]
    UnsupportedType(String),

    /// Malformed or unsupported container header
    #[error("Format parse error: {0}")]
    FormatParse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Element type mismatch: volume holds {actual}, requested {expected}")]
    TypeMismatch {
        expected: ScalarKind,
        actual: ScalarKind,
    },
}

/// Specialized Result type for resample operations
pub type Result<T> = std::result::Result<T, ResampleError>;

impl From<serde_json::Error> for ResampleError {
    fn from(err: serde_json::Error) -> Self {
        ResampleError::Serialization(err.to_string())
    }
}

impl ResampleError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        ResampleError::FormatParse(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ResampleError::Configuration(msg.into())
    }
}
