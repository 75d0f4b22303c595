//! Error types for document attribute access.

use thiserror::Error;

/// Structured error types for reading and writing document attributes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A name is neither mapped, set on the document, nor a type attribute
    #[error("'{schema}' has no attribute '{name}'")]
    AttributeNotFound { schema: String, name: String },

    /// An attribute of an embedded map is not mapped
    #[error("'{name}' is not a mapped attribute at '{path}'")]
    NotMapped { name: String, path: String },

    /// A storage key was removed from a map that does not contain it
    #[error("Key '{key}' not found at '{path}'")]
    KeyNotFound { key: String, path: String },
}

impl DocumentError {
    /// Check if this error means a name could not be resolved
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocumentError::AttributeNotFound { .. }
                | DocumentError::NotMapped { .. }
                | DocumentError::KeyNotFound { .. }
        )
    }

    /// Check if this error concerns a storage key rather than an attribute
    pub fn is_key_error(&self) -> bool {
        matches!(self, DocumentError::KeyNotFound { .. })
    }

    /// Get the attribute name if the error names one
    pub fn name(&self) -> Option<&str> {
        match self {
            DocumentError::AttributeNotFound { name, .. } | DocumentError::NotMapped { name, .. } => {
                Some(name)
            }
            DocumentError::KeyNotFound { .. } => None,
        }
    }
}

impl From<DocumentError> for crate::Error {
    fn from(err: DocumentError) -> Self {
        crate::Error::Document(err)
    }
}
