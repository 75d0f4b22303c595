//! Error types for connection contexts.

use thiserror::Error;

/// Structured error types for connection handling.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// An operation needed an active connection context and none was open
    #[error("A connection is required for {operation}")]
    NoConnection { operation: String },

    /// A connection was started while already active on this thread
    #[error("Connection to '{address}' is already active on this thread")]
    NestedConnection { address: String },

    /// Credentials were malformed or rejected
    #[error("Invalid auth: {reason}")]
    InvalidAuth { reason: String },

    /// A counter was used under a connection bound to another database
    #[error("Database '{expected}' does not match connection database '{actual}'")]
    DatabaseMismatch { expected: String, actual: String },

    /// Connection settings are unusable
    #[error("Invalid connection config: {reason}")]
    InvalidConfig { reason: String },
}

impl ConnectionError {
    /// Check if this error means no connection context was open
    pub fn is_no_connection(&self) -> bool {
        matches!(self, ConnectionError::NoConnection { .. })
    }

    /// Check if this error is authentication-related
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, ConnectionError::InvalidAuth { .. })
    }

    /// Check if this error is a misconfiguration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ConnectionError::InvalidAuth { .. }
                | ConnectionError::InvalidConfig { .. }
                | ConnectionError::DatabaseMismatch { .. }
        )
    }
}

impl From<ConnectionError> for crate::Error {
    fn from(err: ConnectionError) -> Self {
        crate::Error::Connection(err)
    }
}
