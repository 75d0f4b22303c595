//! Error types for raw value operations.
//!
//! These cover the failures that can happen while reading or writing the
//! nested storage structure directly: walking into a value of the wrong
//! shape, indexing past the end of a list, or converting foreign data.

use thiserror::Error;

/// Structured error types for raw value operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValueError {
    /// A value had a different shape than the operation required
    #[error("Value type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A list position was outside the list
    #[error("List index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A storage path could not be used for the requested operation
    #[error("Invalid storage path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Foreign data could not be represented as a stored value
    #[error("Unsupported value: {reason}")]
    Unsupported { reason: String },
}

impl ValueError {
    /// Check if this error is related to type mismatches
    pub fn is_type_error(&self) -> bool {
        matches!(self, ValueError::TypeMismatch { .. })
    }

    /// Check if this error is related to list positions
    pub fn is_index_error(&self) -> bool {
        matches!(self, ValueError::IndexOutOfRange { .. })
    }

    /// Get the path if this is a path-related error
    pub fn path(&self) -> Option<&str> {
        match self {
            ValueError::InvalidPath { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn mismatch(expected: &str, actual: &str) -> Self {
        ValueError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<ValueError> for crate::Error {
    fn from(err: ValueError) -> Self {
        crate::Error::Value(err)
    }
}
