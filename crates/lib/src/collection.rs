//! Typed collection operations.
//!
//! A [`Collection`] binds a [`Schema`] to the backend of the connection that
//! is current on this thread. Queries and updates are written against short
//! storage keys (use [`Schema::key`] to build them); results come back as
//! [`Document`]s of the schema.
//!
//! ```
//! use std::sync::Arc;
//! use shortkey::{
//!     backend::InMemory,
//!     collection::Collection,
//!     connection::{Connection, ConnectionConfig},
//!     document::Document,
//!     schema::Schema,
//!     value::Doc,
//! };
//!
//! let schema = Schema::builder("User")
//!     .database("app")
//!     .collection("users")
//!     .field("name", "n")
//!     .build()?;
//! let connection = Connection::new(ConnectionConfig::default(), Arc::new(InMemory::new()))?;
//!
//! let _guard = connection.start()?;
//! let users = Collection::new(&schema)?;
//! let user = Document::new(&schema);
//! user.set("name", "alice");
//! users.insert(&user)?;
//!
//! let found = users.find_one(&Doc::new().with(schema.key("name")?, "alice"))?;
//! assert_eq!(found.unwrap().get("name")?, "alice");
//! # Ok::<(), shortkey::Error>(())
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    Result,
    backend::{ModifyOptions, Namespace, UpdateOptions},
    connection::Connection,
    constants::ID_KEY,
    document::Document,
    schema::Schema,
    value::{Doc, Value},
};

/// The stored documents of one schema, reached through the current
/// connection.
#[derive(Debug, Clone)]
pub struct Collection {
    schema: Arc<Schema>,
    connection: Connection,
    namespace: Namespace,
}

impl Collection {
    /// Opens the collection of `schema` on the current connection.
    ///
    /// Indexes declared on the schema are ensured the first time its
    /// collection is opened, and again after [`Schema::reset_indexes`].
    ///
    /// # Errors
    /// A configuration error if the schema has no database or collection, a
    /// no-connection error outside a connection context, or an
    /// authentication error.
    pub fn new(schema: &Arc<Schema>) -> Result<Self> {
        let namespace = schema.namespace()?;
        let connection = Connection::require("collection access")?;
        connection.authenticate(namespace.database(), schema.auth())?;

        let collection = Collection {
            schema: Arc::clone(schema),
            connection,
            namespace,
        };
        collection.ensure_indexes()?;
        Ok(collection)
    }

    fn ensure_indexes(&self) -> Result<()> {
        if self.schema.indexes_ensured() {
            return Ok(());
        }
        for index in self.schema.indexes() {
            info!(namespace = %self.namespace, index = %index, "Ensuring index");
            self.connection
                .backend()
                .create_index(&self.namespace, index)?;
        }
        self.schema.mark_indexes_ensured();
        Ok(())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn wrap(&self, raw: Doc) -> Document {
        Document::from_raw(&self.schema, raw)
    }

    /// The first document matching `filter`.
    pub fn find_one(&self, filter: &Doc) -> Result<Option<Document>> {
        let found = self
            .connection
            .backend()
            .find_one(&self.namespace, filter)?;
        Ok(found.map(|raw| self.wrap(raw)))
    }

    /// Every document matching `filter`, in insertion order.
    pub fn find(&self, filter: &Doc) -> Result<Vec<Document>> {
        let found = self.connection.backend().find(&self.namespace, filter)?;
        Ok(found.into_iter().map(|raw| self.wrap(raw)).collect())
    }

    pub fn count(&self, filter: &Doc) -> Result<usize> {
        self.connection.backend().count(&self.namespace, filter)
    }

    /// Inserts `doc`, storing its saved defaults and its new `_id` in it.
    ///
    /// # Returns
    /// The document's `_id`.
    pub fn insert(&self, doc: &Document) -> Result<Value> {
        doc.ensure_saved_defaults()?;
        let id = self
            .connection
            .backend()
            .insert(&self.namespace, doc.to_doc())?;
        doc.set_key(ID_KEY, id.clone());
        debug!(namespace = %self.namespace, id = %id, "Inserted document");
        Ok(id)
    }

    /// Inserts every document in order, stopping at the first failure.
    pub fn insert_many<'d>(&self, docs: impl IntoIterator<Item = &'d Document>) -> Result<Vec<Value>> {
        docs.into_iter().map(|doc| self.insert(doc)).collect()
    }

    /// Inserts `doc` or replaces the stored document with the same `_id`.
    pub fn save(&self, doc: &Document) -> Result<Value> {
        doc.ensure_saved_defaults()?;
        let id = self
            .connection
            .backend()
            .save(&self.namespace, doc.to_doc())?;
        doc.set_key(ID_KEY, id.clone());
        Ok(id)
    }

    /// Applies `update` to documents matching `filter`.
    ///
    /// # Returns
    /// The number of documents updated or inserted.
    pub fn update(&self, filter: &Doc, update: &Doc, options: UpdateOptions) -> Result<usize> {
        self.connection
            .backend()
            .update(&self.namespace, filter, update, options)
    }

    /// Removes every document matching `filter`.
    pub fn remove(&self, filter: &Doc) -> Result<usize> {
        self.connection.backend().remove(&self.namespace, filter)
    }

    /// Atomically updates the first match and returns it.
    pub fn find_and_modify(
        &self,
        filter: &Doc,
        update: &Doc,
        options: ModifyOptions,
    ) -> Result<Option<Document>> {
        let found = self.connection.backend().find_and_modify(
            &self.namespace,
            filter,
            update,
            options,
        )?;
        Ok(found.map(|raw| self.wrap(raw)))
    }
}
