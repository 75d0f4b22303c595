//! Cursor over an embedded map.

use std::fmt;

use tracing::debug;

use super::{Attr, Document, DocumentError, ListMap, mapper};
use crate::{
    Result,
    schema::{EMPTY_REVERSE, NameMap, ReverseNameMap},
    value::{Doc, KeyPath, Value, ValueError},
};

/// An embedded map inside a [`Document`], addressed by its storage path.
///
/// The map may not exist yet. Reads of an unmaterialized map see nothing,
/// and the first write creates it (and any missing parent maps). Deleting
/// the last mapped attribute removes the map from its parent again.
///
/// Maps stored as list elements are never created or removed by a cursor;
/// only the list owns its elements.
pub struct DictMap<'a> {
    doc: &'a Document,
    name_map: &'a NameMap,
    reverse: &'a ReverseNameMap,
    path: KeyPath,
}

impl<'a> DictMap<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        name_map: &'a NameMap,
        reverse: &'a ReverseNameMap,
        path: KeyPath,
    ) -> Self {
        DictMap {
            doc,
            name_map,
            reverse,
            path,
        }
    }

    /// The storage path of this map from the document root.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    pub fn name_map(&self) -> &'a NameMap {
        self.name_map
    }

    /// Returns true if the map exists in the document.
    pub fn is_materialized(&self) -> bool {
        self.doc.raw.borrow().doc_at(&self.path).is_some()
    }

    fn node(&self, name: &str) -> Result<&'a NameMap> {
        self.name_map.get(name).ok_or_else(|| {
            DocumentError::NotMapped {
                name: name.to_string(),
                path: self.path.to_string(),
            }
            .into()
        })
    }

    fn child(&self, node: &'a NameMap) -> (&'a ReverseNameMap, KeyPath) {
        let reverse = self.reverse.get(node.key()).unwrap_or(&EMPTY_REVERSE);
        (reverse, self.path.clone().push_key(node.key()))
    }

    /// Reads the mapped attribute `name`.
    ///
    /// # Errors
    /// [`DocumentError::NotMapped`] if `name` is not mapped in this map.
    pub fn get(&self, name: &str) -> Result<Attr<'a>> {
        let node = self.node(name)?;
        let (reverse, path) = self.child(node);
        Ok(match Attr::resolve(self.doc, node, reverse, &path) {
            Some(attr) => attr,
            None => Attr::absent(self.doc, node, reverse, path),
        })
    }

    /// Sets the mapped attribute `name`, creating this map if needed.
    ///
    /// # Errors
    /// [`DocumentError::NotMapped`] if `name` is not mapped, or a type error
    /// if a non-map value sits where this map belongs.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let node = self.node(name)?;
        self.set_key(node.key(), value)?;
        Ok(())
    }

    /// Deletes the mapped attribute `name`.
    ///
    /// Deleting an attribute that is not stored does nothing. When the map
    /// becomes empty it is removed from its parent.
    ///
    /// # Errors
    /// [`DocumentError::NotMapped`] if `name` is not mapped in this map.
    pub fn delete(&self, name: &str) -> Result<()> {
        let node = self.node(name)?;
        let mut raw = self.doc.raw.borrow_mut();
        let Some(container) = raw.doc_at_mut(&self.path) else {
            return Ok(());
        };
        if container.remove(node.key()).is_some() {
            raw.prune_empty(&self.path);
            debug!(path = %self.path, key = %node.key(), "Deleted embedded attribute");
        }
        Ok(())
    }

    /// A cursor over the embedded map mapped as `name` inside this map.
    ///
    /// # Errors
    /// An attribute error if `name` is unmapped, or a type error if a
    /// non-map value is stored under it.
    pub fn dict(&self, name: &str) -> Result<DictMap<'a>> {
        let node = self.node(name)?;
        let (reverse, path) = self.child(node);
        match self.doc.raw.borrow().get_path(&path) {
            None | Some(Value::Doc(_)) => {}
            Some(other) => return Err(ValueError::mismatch("Doc", other.type_name()).into()),
        }
        Ok(DictMap::new(self.doc, node, reverse, path))
    }

    /// A cursor over the list mapped as `name` inside this map.
    ///
    /// # Errors
    /// An attribute error if `name` is unmapped, or a type error if a
    /// non-list value is stored under it.
    pub fn list(&self, name: &str) -> Result<ListMap<'a>> {
        let node = self.node(name)?;
        let (reverse, path) = self.child(node);
        match self.doc.raw.borrow().get_path(&path) {
            None | Some(Value::List(_)) => {}
            Some(other) => return Err(ValueError::mismatch("List", other.type_name()).into()),
        }
        Ok(ListMap::new(self.doc, node, reverse, path))
    }

    /// Reads a raw storage key of this map.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        self.doc
            .raw
            .borrow()
            .doc_at(&self.path)
            .and_then(|map| map.get(key).cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.doc
            .raw
            .borrow()
            .doc_at(&self.path)
            .is_some_and(|map| map.contains_key(key))
    }

    /// Writes a raw storage key, creating this map if needed.
    pub fn set_key(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let mut raw = self.doc.raw.borrow_mut();
        let map = raw.materialize(&self.path)?;
        Ok(map.insert(key, value))
    }

    /// Removes a raw storage key.
    ///
    /// Removing from a map that does not exist yet does nothing. When the
    /// map becomes empty it is removed from its parent.
    ///
    /// # Errors
    /// [`DocumentError::KeyNotFound`] if the map exists but lacks `key`.
    pub fn remove_key(&self, key: &str) -> Result<Option<Value>> {
        let mut raw = self.doc.raw.borrow_mut();
        let Some(map) = raw.doc_at_mut(&self.path) else {
            return Ok(None);
        };
        let Some(removed) = map.remove(key) else {
            return Err(DocumentError::KeyNotFound {
                key: key.to_string(),
                path: self.path.to_string(),
            }
            .into());
        };
        raw.prune_empty(&self.path);
        Ok(Some(removed))
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.doc
            .raw
            .borrow()
            .doc_at(&self.path)
            .map_or(0, Doc::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.doc
            .raw
            .borrow()
            .doc_at(&self.path)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// A copy of the raw map; empty if it does not exist.
    pub fn to_doc(&self) -> Doc {
        self.doc
            .raw
            .borrow()
            .doc_at(&self.path)
            .cloned()
            .unwrap_or_default()
    }

    /// A copy of this map keyed by attribute names.
    pub fn for_json(&self) -> Doc {
        mapper::map_doc(&self.to_doc(), self.reverse)
    }
}

impl fmt::Debug for DictMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictMap")
            .field("path", &self.path.to_string())
            .field("value", &self.to_doc())
            .finish()
    }
}

impl PartialEq<Doc> for DictMap<'_> {
    fn eq(&self, other: &Doc) -> bool {
        self.to_doc() == *other
    }
}

impl PartialEq<serde_json::Value> for DictMap<'_> {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.to_doc() == *other
    }
}
