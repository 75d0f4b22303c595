//! The stored document map.
//!
//! [`Doc`] is the raw, short-keyed map that actually gets persisted. It is a
//! plain ordered map of storage keys to [`Value`]s with a handful of
//! path-based helpers used by the cursor types in [`crate::document`].
//!
//! ```
//! # use shortkey::value::{Doc, KeyPath};
//! let mut doc = Doc::new();
//! doc.materialize(&KeyPath::new().push_key("m"))?.insert("t", "x");
//! assert_eq!(doc, serde_json::json!({"m": {"t": "x"}}));
//! # Ok::<(), shortkey::Error>(())
//! ```

use std::{collections::BTreeMap, fmt};

use super::{KeyPath, Segment, Value, ValueError};

/// A raw stored document: storage keys mapped to values.
///
/// Keys are kept ordered so serialized output and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Doc {
    children: BTreeMap<String, Value>,
}

impl Doc {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.children.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.children.get_mut(key)
    }

    /// Inserts a value, returning the previous value at that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.children.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.children.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.children.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.children.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.children.values()
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Converts this document into a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.children
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

// Path helpers
impl Doc {
    /// Resolves a path to the value stored there.
    ///
    /// The empty path has no value (the root is a `Doc`, not a `Value`); use
    /// [`Doc::doc_at`] to address containers including the root.
    pub fn get_path(&self, path: &KeyPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = match first {
            Segment::Key(key) => self.children.get(key)?,
            Segment::Index(_) => return None,
        };
        for segment in rest {
            current = match (segment, current) {
                (Segment::Key(key), Value::Doc(doc)) => doc.children.get(key)?,
                (Segment::Index(index), Value::List(list)) => list.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_path_mut(&mut self, path: &KeyPath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = match first {
            Segment::Key(key) => self.children.get_mut(key)?,
            Segment::Index(_) => return None,
        };
        for segment in rest {
            current = match (segment, current) {
                (Segment::Key(key), Value::Doc(doc)) => doc.children.get_mut(key)?,
                (Segment::Index(index), Value::List(list)) => list.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns the map at `path`, treating the empty path as this document.
    pub fn doc_at(&self, path: &KeyPath) -> Option<&Doc> {
        if path.is_empty() {
            return Some(self);
        }
        self.get_path(path).and_then(Value::as_doc)
    }

    pub fn doc_at_mut(&mut self, path: &KeyPath) -> Option<&mut Doc> {
        if path.is_empty() {
            return Some(self);
        }
        self.get_path_mut(path).and_then(Value::as_doc_mut)
    }

    /// Returns the map at `path`, creating empty maps for every missing
    /// keyed segment on the way.
    ///
    /// Positional segments are never created: the list element must already
    /// exist. Walking into a value that is neither a map nor a list is a type
    /// error rather than an overwrite.
    pub fn materialize(&mut self, path: &KeyPath) -> Result<&mut Doc, ValueError> {
        match path.segments().split_first() {
            None => Ok(self),
            Some((Segment::Key(key), rest)) => {
                let slot = self
                    .children
                    .entry(key.clone())
                    .or_insert_with(|| Value::Doc(Doc::new()));
                materialize_value(slot, rest)
            }
            Some((Segment::Index(_), _)) => Err(ValueError::mismatch("list", "doc")),
        }
    }

    /// Returns the list at `path`, creating an empty list (and any missing
    /// parent maps) if nothing is stored there yet.
    pub fn list_mut(&mut self, path: &KeyPath) -> Result<&mut Vec<Value>, ValueError> {
        let slot = match path.split_last() {
            None => return Err(ValueError::mismatch("list", "doc")),
            Some((Segment::Key(key), parent)) => self
                .materialize(&parent)?
                .children
                .entry(key.clone())
                .or_insert_with(|| Value::List(Vec::new())),
            Some((Segment::Index(index), parent)) => {
                let list = self
                    .get_path_mut(&parent)
                    .and_then(Value::as_list_mut)
                    .ok_or_else(|| ValueError::InvalidPath {
                        path: parent.to_string(),
                        reason: "no list stored at path".to_string(),
                    })?;
                let len = list.len();
                list.get_mut(*index)
                    .ok_or(ValueError::IndexOutOfRange { index: *index, len })?
            }
        };
        match slot {
            Value::List(list) => Ok(list),
            other => Err(ValueError::mismatch("list", other.type_name())),
        }
    }

    /// Removes the value at `path`, returning it if it was present.
    pub fn remove_path(&mut self, path: &KeyPath) -> Option<Value> {
        match path.split_last()? {
            (Segment::Key(key), parent) => self.doc_at_mut(&parent)?.remove(key),
            (Segment::Index(index), parent) => {
                let list = self.get_path_mut(&parent)?.as_list_mut()?;
                (*index < list.len()).then(|| list.remove(*index))
            }
        }
    }

    /// Removes empty maps starting at `path` and walking towards the root.
    ///
    /// Stops at the first non-empty map, at the root, or at a list element:
    /// list positions are never removed by pruning.
    pub fn prune_empty(&mut self, path: &KeyPath) {
        let mut current = path.clone();
        loop {
            let Some((Segment::Key(key), parent)) = current.split_last() else {
                break;
            };
            let key = key.clone();
            let empty = matches!(self.get_path(&current), Some(Value::Doc(doc)) if doc.is_empty());
            if !empty {
                break;
            }
            if let Some(container) = self.doc_at_mut(&parent) {
                container.remove(&key);
            }
            current = parent;
        }
    }
}

fn materialize_value<'v>(slot: &'v mut Value, rest: &[Segment]) -> Result<&'v mut Doc, ValueError> {
    match rest.split_first() {
        None => match slot {
            Value::Doc(doc) => Ok(doc),
            other => Err(ValueError::mismatch("doc", other.type_name())),
        },
        Some((Segment::Key(key), tail)) => match slot {
            Value::Doc(doc) => {
                let next = doc
                    .children
                    .entry(key.clone())
                    .or_insert_with(|| Value::Doc(Doc::new()));
                materialize_value(next, tail)
            }
            other => Err(ValueError::mismatch("doc", other.type_name())),
        },
        Some((Segment::Index(index), tail)) => match slot {
            Value::List(list) => {
                let len = list.len();
                let next = list
                    .get_mut(*index)
                    .ok_or(ValueError::IndexOutOfRange { index: *index, len })?;
                materialize_value(next, tail)
            }
            other => Err(ValueError::mismatch("list", other.type_name())),
        },
    }
}

impl fmt::Display for Doc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, Value)> for Doc {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Doc {
            children: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Doc {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.into_iter()
    }
}

impl<'a> IntoIterator for &'a Doc {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

impl TryFrom<serde_json::Value> for Doc {
    type Error = ValueError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(value) {
            Value::Doc(doc) => Ok(doc),
            other => Err(ValueError::mismatch("doc", other.type_name())),
        }
    }
}

impl PartialEq<serde_json::Value> for Doc {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.to_json() == *other
    }
}
