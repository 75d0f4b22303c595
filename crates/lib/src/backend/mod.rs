//! Storage backends.
//!
//! This module provides the [`Backend`] trait and its implementations. The
//! trait speaks raw short-keyed [`Doc`]s only; attribute names never reach
//! storage. Collection operations (`crate::collection`) translate documents
//! and delegate here, which keeps the mapping layer independent of the
//! storage mechanism.

use std::{any::Any, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    connection::Credentials,
    schema::Index,
    value::{Doc, Value},
};

pub mod database;
pub mod errors;

pub use database::InMemory;
pub use errors::BackendError;

/// Storage address of a collection: a database and a collection name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Namespace {
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Options for [`Backend::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when nothing matches
    pub upsert: bool,
    /// Update every match instead of only the first
    pub multi: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        UpdateOptions {
            upsert: true,
            ..Default::default()
        }
    }

    pub fn multi() -> Self {
        UpdateOptions {
            multi: true,
            ..Default::default()
        }
    }
}

/// Options for [`Backend::find_and_modify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifyOptions {
    /// Insert a new document when nothing matches
    pub upsert: bool,
    /// Return the document after the update instead of before it
    pub return_new: bool,
}

/// Storage trait abstracting the mechanism documents are persisted with.
///
/// Filters are maps of dotted storage keys to expected values. Updates are
/// either operator documents (`$set`, `$unset`, `$inc`) or whole
/// replacement documents.
///
/// All implementations must be `Send` and `Sync` to allow sharing across
/// threads, and implement `Any` to allow for downcasting if needed.
pub trait Backend: Send + Sync + Any {
    /// Returns every document in `ns` matching `filter`, in insertion order.
    fn find(&self, ns: &Namespace, filter: &Doc) -> Result<Vec<Doc>>;

    /// Returns the first document matching `filter`.
    fn find_one(&self, ns: &Namespace, filter: &Doc) -> Result<Option<Doc>> {
        Ok(self.find(ns, filter)?.into_iter().next())
    }

    fn count(&self, ns: &Namespace, filter: &Doc) -> Result<usize> {
        Ok(self.find(ns, filter)?.len())
    }

    /// Inserts a new document, assigning an `_id` if it has none.
    ///
    /// # Returns
    /// The document's `_id`.
    fn insert(&self, ns: &Namespace, doc: Doc) -> Result<Value>;

    /// Inserts or replaces a document by `_id`, assigning one if missing.
    fn save(&self, ns: &Namespace, doc: Doc) -> Result<Value>;

    /// Applies `update` to matching documents.
    ///
    /// # Returns
    /// The number of documents updated or inserted.
    fn update(&self, ns: &Namespace, filter: &Doc, update: &Doc, options: UpdateOptions)
    -> Result<usize>;

    /// Removes every matching document, returning how many were removed.
    fn remove(&self, ns: &Namespace, filter: &Doc) -> Result<usize>;

    /// Atomically updates the first matching document and returns it.
    ///
    /// Returns `None` when nothing matched and no document was upserted, or
    /// when a document was upserted but the pre-update state was requested.
    fn find_and_modify(
        &self,
        ns: &Namespace,
        filter: &Doc,
        update: &Doc,
        options: ModifyOptions,
    ) -> Result<Option<Doc>>;

    /// Creates `index` if it does not exist yet.
    fn create_index(&self, ns: &Namespace, index: &Index) -> Result<()>;

    /// Checks credentials for `database`. Backends without access control
    /// accept everything.
    fn authenticate(&self, _database: &str, _credentials: &Credentials) -> Result<()> {
        Ok(())
    }

    /// Returns a reference to the backend as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
