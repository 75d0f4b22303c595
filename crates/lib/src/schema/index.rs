//! Index declarations.
//!
//! An [`Index`] is declared against logical attribute names and resolved to
//! dotted storage keys when the schema is built. Names that are not mapped
//! pass through unchanged so raw storage keys can be indexed too.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::{SchemaError, name_map::NameMap};
use crate::{constants::DEFAULT_INDEX_CACHE_SECS, value::Value};

/// Sort direction of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// The conventional numeric form: `1` ascending, `-1` descending.
    pub fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// A secondary index on a collection.
///
/// `unique` and `sparse` are enforced by [`InMemory`](crate::backend::InMemory).
/// `background` and `cache_for` are build hints for the storage server: they
/// travel with the index to [`Backend::create_index`](crate::backend::Backend::create_index)
/// and are persisted, but the in-memory backend builds every index
/// immediately and keeps it for good. How often indexes are ensured is
/// decided by [`Schema::reset_indexes`](super::Schema::reset_indexes), not by
/// `cache_for`.
///
/// ```
/// # use shortkey::schema::{Direction, Index};
/// let simple = Index::new("value").sparse();
/// let compound = Index::compound([("user_name", Direction::Ascending), ("value", Direction::Descending)])
///     .unique()
///     .cache_for(60);
/// assert!(compound.is_compound());
/// assert!(simple.is_background());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    keys: Vec<(String, Direction)>,
    compound: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    sparse: bool,
    #[serde(default = "default_background")]
    background: bool,
    #[serde(default = "default_cache_for")]
    cache_for: u64,
}

fn default_background() -> bool {
    true
}

fn default_cache_for() -> u64 {
    DEFAULT_INDEX_CACHE_SECS
}

impl Index {
    /// An ascending index on a single attribute or dotted attribute path.
    pub fn new(name: impl Into<String>) -> Self {
        Index {
            keys: vec![(name.into(), Direction::Ascending)],
            compound: false,
            unique: false,
            sparse: false,
            background: default_background(),
            cache_for: default_cache_for(),
        }
    }

    /// A compound index over `(name, direction)` pairs.
    pub fn compound<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: Into<String>,
    {
        Index {
            keys: keys
                .into_iter()
                .map(|(name, direction)| (name.into(), direction))
                .collect(),
            compound: true,
            ..Index::new("")
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Asks the backend to build the index without blocking writes.
    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// How long, in seconds, the backend may treat an ensured index as
    /// fresh before checking it again.
    pub fn cache_for(mut self, secs: u64) -> Self {
        self.cache_for = secs;
        self
    }

    pub fn keys(&self) -> &[(String, Direction)] {
        &self.keys
    }

    pub fn is_compound(&self) -> bool {
        self.compound
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn cache_secs(&self) -> u64 {
        self.cache_for
    }

    /// Conventional index name, e.g. `"u_1_v_-1"`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(key, direction)| format!("{key}_{}", direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Returns a copy of this index with every attribute name replaced by
    /// its dotted storage key.
    pub(crate) fn resolve(
        &self,
        name_map: &NameMap,
        attributes: &BTreeMap<String, Value>,
    ) -> Result<Index, SchemaError> {
        if self.keys.is_empty() || self.keys.iter().any(|(name, _)| name.is_empty()) {
            return Err(SchemaError::InvalidIndex {
                reason: format!("{self} must name at least one non-empty key"),
            });
        }
        let keys = self
            .keys
            .iter()
            .map(|(name, direction)| Ok((resolve_name(name, name_map, attributes)?, *direction)))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Index {
            keys,
            ..self.clone()
        })
    }
}

/// Resolves a dotted attribute path to its dotted storage keys.
///
/// Unmapped names are returned as-is. A name that refers to a type-level
/// attribute rather than a mapped key is an error.
fn resolve_name(
    name: &str,
    name_map: &NameMap,
    attributes: &BTreeMap<String, Value>,
) -> Result<String, SchemaError> {
    if let Some(node) = name_map.resolve(name) {
        return Ok(node.path().to_string());
    }
    if let Some(value) = attributes.get(name) {
        return Err(SchemaError::InvalidIndexKey {
            name: name.to_string(),
            reason: format!("attribute holds a {} value, not a storage key", value.type_name()),
        });
    }
    Ok(name.to_string())
}

impl From<&str> for Index {
    fn from(name: &str) -> Self {
        Index::new(name)
    }
}

impl From<String> for Index {
    fn from(name: String) -> Self {
        Index::new(name)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.name())
    }
}
