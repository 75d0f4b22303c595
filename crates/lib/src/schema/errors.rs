//! Error types for document type declarations.
//!
//! Everything here is a configuration error: it is raised while building a
//! [`Schema`](super::Schema) or when a schema is used for storage it was
//! never configured for.

use thiserror::Error;

/// Structured error types for schema declarations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// An attribute name collides with a collection or map operation
    #[error("'{name}' is a reserved attribute name in schema '{schema}'")]
    ReservedName { schema: String, name: String },

    /// An attribute name is not mapped by the schema
    #[error("'{name}' is not mapped in schema '{schema}'")]
    NotMapped { schema: String, name: String },

    /// A storage key cannot address a single map entry
    #[error("Attribute '{name}' has invalid storage key '{key}'")]
    InvalidKey { name: String, key: String },

    /// A storage address is incomplete
    #[error("Schema '{schema}' is missing {setting}")]
    MissingConfig { schema: String, setting: String },

    /// An index declaration has the wrong shape
    #[error("Invalid index: {reason}")]
    InvalidIndex { reason: String },

    /// An index name resolved to something that is not a storage key
    #[error("Invalid index key '{name}': {reason}")]
    InvalidIndexKey { name: String, reason: String },
}

impl SchemaError {
    /// Check if this error is a misconfigured declaration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SchemaError::ReservedName { .. }
                | SchemaError::InvalidKey { .. }
                | SchemaError::MissingConfig { .. }
        )
    }

    /// Check if this error is related to index declarations
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidIndex { .. } | SchemaError::InvalidIndexKey { .. }
        )
    }

    /// Check if this error means an attribute could not be resolved
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotMapped { .. })
    }

    /// Get the schema name if the error names one
    pub fn schema(&self) -> Option<&str> {
        match self {
            SchemaError::ReservedName { schema, .. }
            | SchemaError::NotMapped { schema, .. }
            | SchemaError::MissingConfig { schema, .. } => Some(schema),
            _ => None,
        }
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
