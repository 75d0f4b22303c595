//! Persistence operations for the InMemory database
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory database state to/from JSON files.

use std::{collections::HashMap, path::Path, sync::RwLock};

use serde::{Deserialize, Deserializer, Serialize};

use super::{CollectionState, InMemory};
use crate::{
    Error, Result,
    backend::{Namespace, errors::BackendError},
    schema::Index,
    value::Doc,
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// One collection as written to disk.
#[derive(Serialize, Deserialize)]
struct StoredCollection {
    namespace: Namespace,
    documents: Vec<Doc>,
    #[serde(default)]
    indexes: Vec<Index>,
}

/// Serializable version of the InMemory database.
#[derive(Serialize, Deserialize)]
struct SerializableDatabase {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    collections: Vec<StoredCollection>,
}

/// Saves every collection to `path` as pretty-printed JSON.
pub(crate) fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let mut collections: Vec<_> = backend
        .read()?
        .iter()
        .map(|(namespace, state)| StoredCollection {
            namespace: namespace.clone(),
            documents: state.documents.clone(),
            indexes: state.indexes.clone(),
        })
        .collect();
    collections.sort_by(|a, b| a.namespace.cmp(&b.namespace));

    let serializable = SerializableDatabase {
        version: PERSISTENCE_VERSION,
        collections,
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    std::fs::write(path, json).map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads the database state from a JSON file.
///
/// If the file does not exist, a new, empty `InMemory` database is returned.
pub(crate) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match std::fs::read_to_string(path) {
        Ok(json) => {
            let serializable: SerializableDatabase =
                serde_json::from_str(&json).map_err(|e| -> Error {
                    BackendError::DeserializationFailed { source: e }.into()
                })?;
            let collections: HashMap<_, _> = serializable
                .collections
                .into_iter()
                .map(|stored| {
                    let state = CollectionState {
                        documents: stored.documents,
                        indexes: stored.indexes,
                    };
                    (stored.namespace, state)
                })
                .collect();
            Ok(InMemory {
                collections: RwLock::new(collections),
                users: RwLock::default(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
