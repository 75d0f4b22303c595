//!
//! Shortkey: readable attribute names over compact stored documents.
//! Documents are stored with short keys to save space, while code reads and writes them through long, descriptive names.
//!
//! ## Core Concepts
//!
//! * **Schemas (`schema::Schema`)**: Immutable document type declarations mapping logical attribute names to short storage keys, built once with `schema::SchemaBuilder` and shared behind an `Arc`.
//! * **Embeds (`schema::Embed`)**: Nested groups of bindings describing a sub-document stored under a single key.
//! * **Documents (`document::Document`)**: A raw short-keyed map plus its schema, read and written by logical name.
//! * **Cursors (`document::DictMap`, `document::ListMap`)**: Write-through views into embedded maps and lists, addressed by storage path and resolved fresh on every access.
//! * **Defaults**: Static defaults are returned but never stored; saved defaults (`schema::SavedDefault`) are generated once and stored in the document.
//! * **Connections (`connection::Connection`)**: A thread-local, scoped context that collection operations require.
//! * **Collections (`collection::Collection`)**: Typed find/insert/update/remove operations against a storage backend.
//! * **Backends (`backend::Backend`)**: A pluggable storage layer speaking raw short-keyed documents; `backend::InMemory` is the reference implementation.

pub mod backend;
pub mod collection;
pub mod connection;
pub mod constants;
pub mod document;
pub mod helpers;
pub mod schema;
pub mod value;

pub use collection::Collection;
pub use connection::{Connection, ConnectionConfig};
pub use document::{Attr, Document};
pub use schema::{Embed, Schema};
pub use value::{Doc, Value};

/// Result type used throughout the shortkey library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the shortkey library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured raw value errors from the value module
    #[error(transparent)]
    Value(value::ValueError),

    /// Structured declaration errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured attribute access errors from the document module
    #[error(transparent)]
    Document(document::DocumentError),

    /// Structured connection context errors from the connection module
    #[error(transparent)]
    Connection(connection::ConnectionError),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Value(_) => "value",
            Error::Schema(_) => "schema",
            Error::Document(_) => "document",
            Error::Connection(_) => "connection",
            Error::Backend(_) => "backend",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error means a name or key could not be resolved.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Schema(schema_err) => schema_err.is_not_found(),
            Error::Document(document_err) => document_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a misconfigured document type or connection.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Schema(schema_err) => schema_err.is_config_error() || schema_err.is_index_error(),
            Error::Connection(connection_err) => connection_err.is_config_error(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Value(value_err) => value_err.is_type_error(),
            Error::Schema(schema_err) => {
                matches!(schema_err, schema::SchemaError::InvalidIndexKey { .. })
            }
            _ => false,
        }
    }

    /// Check if this error is a list position outside the list.
    pub fn is_index_error(&self) -> bool {
        match self {
            Error::Value(value_err) => value_err.is_index_error(),
            _ => false,
        }
    }

    /// Check if this error means no connection context was open.
    pub fn is_no_connection(&self) -> bool {
        match self {
            Error::Connection(connection_err) => connection_err.is_no_connection(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Connection(connection_err) => connection_err.is_authentication_error(),
            Error::Backend(backend_err) => backend_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error is a unique-index violation.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_duplicate_key(),
            _ => false,
        }
    }

    /// Check if this error is storage-related.
    pub fn is_database_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }
}
