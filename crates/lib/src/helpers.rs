//! Saved-default helpers.
//!
//! [`auto_increment`] builds a [`SavedDefault`] that draws sequential values
//! from a sidecar counter document, incremented atomically through the
//! backend of the current connection.
//!
//! ```
//! use std::sync::Arc;
//! use shortkey::{
//!     backend::InMemory,
//!     connection::{Connection, ConnectionConfig},
//!     document::Document,
//!     helpers::auto_increment,
//!     schema::Schema,
//! };
//!
//! let schema = Schema::builder("Ticket")
//!     .field_with_generator("number", "n", auto_increment("app", "counters", "Ticket_number"))
//!     .build()?;
//! let connection = Connection::new(ConnectionConfig::default(), Arc::new(InMemory::new()))?;
//!
//! connection.scope(|| {
//!     assert_eq!(Document::new(&schema).get("number")?, 1);
//!     assert_eq!(Document::new(&schema).get("number")?, 2);
//!     Ok(())
//! })?;
//! # Ok::<(), shortkey::Error>(())
//! ```
//!
//! Schemas extending a schema with an auto-increment field share its counter
//! unless they rebind the field.

use tracing::debug;

use crate::{
    Result,
    backend::{BackendError, ModifyOptions, Namespace},
    connection::{Connection, ConnectionError},
    constants::{DEFAULT_COUNTER_FIELD, ID_KEY},
    schema::SavedDefault,
    value::{Doc, Value},
};

/// A sidecar counter. Convert it into a [`SavedDefault`] to use it as a
/// generated field.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoIncrement {
    namespace: Namespace,
    id: String,
    field: String,
    increment: i64,
}

/// Declares a counter stored in `database.collection` under the document
/// `_id == id`.
///
/// The counter increments the field `"value"` by 1 unless configured
/// otherwise with [`AutoIncrement::field`] and [`AutoIncrement::increment`].
pub fn auto_increment(
    database: impl Into<String>,
    collection: impl Into<String>,
    id: impl Into<String>,
) -> AutoIncrement {
    AutoIncrement {
        namespace: Namespace::new(database, collection),
        id: id.into(),
        field: DEFAULT_COUNTER_FIELD.to_string(),
        increment: 1,
    }
}

impl AutoIncrement {
    /// Stores the counter in `field` of the sidecar document.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Increments the counter by `increment` per generated value.
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = increment;
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Atomically increments the counter and returns its new value.
    ///
    /// # Errors
    /// - [`ConnectionError::NoConnection`] outside a connection context.
    /// - [`ConnectionError::DatabaseMismatch`] if the current connection is
    ///   bound to a different database.
    /// - [`BackendError::CounterUnavailable`] if the counter document lacks
    ///   the counter field.
    pub fn next_value(&self) -> Result<Value> {
        let connection = Connection::require("auto_increment defaults")?;
        if let Some(database) = connection.database() {
            if database != self.namespace.database() {
                return Err(ConnectionError::DatabaseMismatch {
                    expected: self.namespace.database().to_string(),
                    actual: database.to_string(),
                }
                .into());
            }
        }

        let filter = Doc::new().with(ID_KEY, self.id.as_str());
        let update =
            Doc::new().with("$inc", Doc::new().with(self.field.as_str(), self.increment));
        let counter = connection.backend().find_and_modify(
            &self.namespace,
            &filter,
            &update,
            ModifyOptions {
                upsert: true,
                return_new: true,
            },
        )?;

        let value = counter.and_then(|mut doc| doc.remove(&self.field));
        let Some(value) = value else {
            return Err(BackendError::CounterUnavailable {
                namespace: self.namespace.to_string(),
                id: self.id.clone(),
                field: self.field.clone(),
            }
            .into());
        };
        debug!(namespace = %self.namespace, id = %self.id, value = %value, "Incremented counter");
        Ok(value)
    }
}

impl From<AutoIncrement> for SavedDefault {
    fn from(counter: AutoIncrement) -> Self {
        SavedDefault::try_new(move || counter.next_value())
    }
}
