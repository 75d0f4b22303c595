//! Storage error types.
//!
//! Structured errors raised by [`Backend`](super::Backend) implementations.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// A write would violate a unique index.
    #[error("Duplicate key in {namespace}: {key} = {value}")]
    DuplicateKey {
        /// `database.collection` of the write
        namespace: String,
        /// Dotted storage key of the violated index
        key: String,
        /// Offending value, rendered for display
        value: String,
    },

    /// An update document could not be applied.
    #[error("Invalid update: {reason}")]
    InvalidUpdate {
        /// What was wrong with the update
        reason: String,
    },

    /// A filter document could not be evaluated.
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// What was wrong with the filter
        reason: String,
    },

    /// A counter document did not yield a new value.
    #[error("Could not get a new counter value for {namespace} : {id}.{field}")]
    CounterUnavailable {
        namespace: String,
        id: String,
        field: String,
    },

    /// Credentials were rejected.
    #[error("Authentication failed for '{username}' on database '{database}'")]
    AuthenticationFailed { database: String, username: String },

    /// A lock guarding storage state was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// File I/O failed.
    #[error("File I/O error")]
    FileIo {
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Check if this error is a unique-index violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, BackendError::DuplicateKey { .. })
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, BackendError::AuthenticationFailed { .. })
    }

    /// Check if this error is I/O or serialization related.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Check if this error is a caller mistake rather than a storage failure.
    pub fn is_logical_error(&self) -> bool {
        matches!(
            self,
            BackendError::DuplicateKey { .. }
                | BackendError::InvalidUpdate { .. }
                | BackendError::InvalidQuery { .. }
        )
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
