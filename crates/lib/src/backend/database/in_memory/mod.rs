//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the [`Backend`]
//! trait, suitable for testing, development, or scenarios where data
//! persistence is handled by saving and loading the whole state as JSON.

mod persistence;
mod query;

use std::{
    any::Any,
    collections::HashMap,
    path::Path,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::debug;

use crate::{
    Result,
    backend::{Backend, BackendError, ModifyOptions, Namespace, UpdateOptions},
    connection::Credentials,
    constants::ID_KEY,
    schema::Index,
    value::{Doc, Value},
};

/// Documents and index definitions of one collection.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionState {
    pub(crate) documents: Vec<Doc>,
    pub(crate) indexes: Vec<Index>,
}

impl CollectionState {
    fn positions(&self, filter: &Doc) -> std::result::Result<Vec<usize>, BackendError> {
        let mut positions = Vec::new();
        for (position, doc) in self.documents.iter().enumerate() {
            if query::matches(doc, filter)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    fn first(&self, filter: &Doc) -> std::result::Result<Option<usize>, BackendError> {
        for (position, doc) in self.documents.iter().enumerate() {
            if query::matches(doc, filter)? {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    fn push(&mut self, ns: &Namespace, mut doc: Doc) -> std::result::Result<Value, BackendError> {
        let id = query::ensure_id(&mut doc);
        query::check_unique(ns, &self.documents, &self.indexes, &doc, None)?;
        self.documents.push(doc);
        Ok(id)
    }

    fn replace(
        &mut self,
        ns: &Namespace,
        position: usize,
        doc: Doc,
    ) -> std::result::Result<(), BackendError> {
        query::check_unique(ns, &self.documents, &self.indexes, &doc, Some(position))?;
        self.documents[position] = doc;
        Ok(())
    }

    /// Applies `update` to the document at `position`, returning the new state.
    fn modify(
        &mut self,
        ns: &Namespace,
        position: usize,
        update: &Doc,
    ) -> std::result::Result<Doc, BackendError> {
        let mut doc = self.documents[position].clone();
        query::apply_update(&mut doc, update)?;
        self.replace(ns, position, doc.clone())?;
        Ok(doc)
    }

    fn upsert(
        &mut self,
        ns: &Namespace,
        filter: &Doc,
        update: &Doc,
    ) -> std::result::Result<Doc, BackendError> {
        let mut doc = query::upsert_seed(filter)?;
        query::apply_update(&mut doc, update)?;
        query::ensure_id(&mut doc);
        self.push(ns, doc.clone())?;
        Ok(doc)
    }
}

/// A simple in-memory document store.
///
/// Collections live in a `HashMap` keyed by [`Namespace`] behind a
/// read-write lock. It provides basic persistence via
/// [`InMemory::save_to_file`] and [`InMemory::load_from_file`].
///
/// Optional per-database users make [`Backend::authenticate`] meaningful in
/// tests. Users are not persisted.
#[derive(Debug, Default)]
pub struct InMemory {
    pub(crate) collections: RwLock<HashMap<Namespace, CollectionState>>,
    pub(crate) users: RwLock<HashMap<String, Vec<Credentials>>>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `credentials` for every future authentication against
    /// `database`.
    pub fn add_user(&self, database: impl Into<String>, credentials: Credentials) -> Result<()> {
        self.users
            .write()
            .map_err(|_| BackendError::LockPoisoned)?
            .entry(database.into())
            .or_default()
            .push(credentials);
        Ok(())
    }

    /// Every namespace holding documents or indexes.
    pub fn namespaces(&self) -> Result<Vec<Namespace>> {
        let mut namespaces: Vec<_> = self.read()?.keys().cloned().collect();
        namespaces.sort();
        Ok(namespaces)
    }

    /// Index definitions created on `ns`.
    pub fn indexes(&self, ns: &Namespace) -> Result<Vec<Index>> {
        Ok(self
            .read()?
            .get(ns)
            .map(|state| state.indexes.clone())
            .unwrap_or_default())
    }

    /// Saves the entire database state to a specified file as JSON.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Loads the database state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` database is returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Namespace, CollectionState>>> {
        Ok(self
            .collections
            .read()
            .map_err(|_| BackendError::LockPoisoned)?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Namespace, CollectionState>>> {
        Ok(self
            .collections
            .write()
            .map_err(|_| BackendError::LockPoisoned)?)
    }
}

impl Backend for InMemory {
    fn find(&self, ns: &Namespace, filter: &Doc) -> Result<Vec<Doc>> {
        let collections = self.read()?;
        let Some(state) = collections.get(ns) else {
            return Ok(Vec::new());
        };
        Ok(state
            .positions(filter)?
            .into_iter()
            .map(|position| state.documents[position].clone())
            .collect())
    }

    fn find_one(&self, ns: &Namespace, filter: &Doc) -> Result<Option<Doc>> {
        let collections = self.read()?;
        let Some(state) = collections.get(ns) else {
            return Ok(None);
        };
        Ok(state
            .first(filter)?
            .map(|position| state.documents[position].clone()))
    }

    fn insert(&self, ns: &Namespace, doc: Doc) -> Result<Value> {
        let id = self.write()?.entry(ns.clone()).or_default().push(ns, doc)?;
        debug!(namespace = %ns, id = %id, "Inserted document");
        Ok(id)
    }

    fn save(&self, ns: &Namespace, mut doc: Doc) -> Result<Value> {
        let mut collections = self.write()?;
        let state = collections.entry(ns.clone()).or_default();
        let id = query::ensure_id(&mut doc);
        let existing = state
            .documents
            .iter()
            .position(|stored| stored.get(ID_KEY) == Some(&id));
        match existing {
            Some(position) => state.replace(ns, position, doc)?,
            None => {
                state.push(ns, doc)?;
            }
        }
        debug!(namespace = %ns, id = %id, replaced = existing.is_some(), "Saved document");
        Ok(id)
    }

    fn update(
        &self,
        ns: &Namespace,
        filter: &Doc,
        update: &Doc,
        options: UpdateOptions,
    ) -> Result<usize> {
        let mut collections = self.write()?;
        let state = collections.entry(ns.clone()).or_default();
        let mut positions = state.positions(filter)?;
        if positions.is_empty() {
            if !options.upsert {
                return Ok(0);
            }
            state.upsert(ns, filter, update)?;
            debug!(namespace = %ns, "Upserted document");
            return Ok(1);
        }
        if !options.multi {
            positions.truncate(1);
        }
        for &position in &positions {
            state.modify(ns, position, update)?;
        }
        debug!(namespace = %ns, updated = positions.len(), "Updated documents");
        Ok(positions.len())
    }

    fn remove(&self, ns: &Namespace, filter: &Doc) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(state) = collections.get_mut(ns) else {
            return Ok(0);
        };
        let positions = state.positions(filter)?;
        for &position in positions.iter().rev() {
            state.documents.remove(position);
        }
        debug!(namespace = %ns, removed = positions.len(), "Removed documents");
        Ok(positions.len())
    }

    fn find_and_modify(
        &self,
        ns: &Namespace,
        filter: &Doc,
        update: &Doc,
        options: ModifyOptions,
    ) -> Result<Option<Doc>> {
        let mut collections = self.write()?;
        let state = collections.entry(ns.clone()).or_default();
        match state.first(filter)? {
            Some(position) => {
                let before = state.documents[position].clone();
                let after = state.modify(ns, position, update)?;
                Ok(Some(if options.return_new { after } else { before }))
            }
            None if options.upsert => {
                let doc = state.upsert(ns, filter, update)?;
                Ok(options.return_new.then_some(doc))
            }
            None => Ok(None),
        }
    }

    fn create_index(&self, ns: &Namespace, index: &Index) -> Result<()> {
        let mut collections = self.write()?;
        let state = collections.entry(ns.clone()).or_default();
        if state
            .indexes
            .iter()
            .any(|existing| existing.keys() == index.keys())
        {
            return Ok(());
        }
        if index.is_unique() {
            let indexes = [index.clone()];
            for (position, doc) in state.documents.iter().enumerate() {
                query::check_unique(ns, &state.documents, &indexes, doc, Some(position))?;
            }
        }
        state.indexes.push(index.clone());
        debug!(namespace = %ns, index = %index, "Created index");
        Ok(())
    }

    fn authenticate(&self, database: &str, credentials: &Credentials) -> Result<()> {
        let users = self.users.read().map_err(|_| BackendError::LockPoisoned)?;
        match users.get(database) {
            Some(allowed) if !allowed.contains(credentials) => {
                Err(BackendError::AuthenticationFailed {
                    database: database.to_string(),
                    username: credentials.username().to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
