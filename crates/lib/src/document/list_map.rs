//! Cursor over a list whose elements may be embedded documents.

use std::fmt;

use super::{DictMap, Document, mapper};
use crate::{
    Result,
    schema::{NameMap, ReverseNameMap},
    value::{KeyPath, Value, ValueError},
};

/// A list inside a [`Document`].
///
/// Map elements are handed out as [`DictMap`] cursors using the list's own
/// name map, so a list of embedded documents reads like the embed itself.
///
/// ```
/// use shortkey::{document::Document, schema::{Embed, Schema}};
///
/// let schema = Schema::builder("Post")
///     .embed("comments", Embed::new("c").field("author", "a"))
///     .build()?;
/// let post = Document::new(&schema);
///
/// let comments = post.list("comments")?;
/// comments.new_item()?.set("author", "bob")?;
/// assert_eq!(comments.get(0)?.into_dict()?.get("author")?, "bob");
/// assert_eq!(post, serde_json::json!({"c": [{"a": "bob"}]}));
/// # Ok::<(), shortkey::Error>(())
/// ```
pub struct ListMap<'a> {
    doc: &'a Document,
    name_map: &'a NameMap,
    reverse: &'a ReverseNameMap,
    path: KeyPath,
}

/// An element read from a [`ListMap`].
#[derive(Debug)]
pub enum Element<'a> {
    /// A map element under a non-empty name map
    Dict(DictMap<'a>),
    Value(Value),
}

impl<'a> Element<'a> {
    /// Unwraps a map element cursor.
    ///
    /// # Errors
    /// A type error for plain values.
    pub fn into_dict(self) -> Result<DictMap<'a>> {
        match self {
            Element::Dict(dict) => Ok(dict),
            Element::Value(value) => Err(ValueError::mismatch("DictMap", value.type_name()).into()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Element::Dict(dict) => Value::Doc(dict.to_doc()),
            Element::Value(value) => value.clone(),
        }
    }
}

impl<T> PartialEq<T> for Element<'_>
where
    Value: PartialEq<T>,
{
    fn eq(&self, other: &T) -> bool {
        self.to_value() == *other
    }
}

impl<'a> ListMap<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        name_map: &'a NameMap,
        reverse: &'a ReverseNameMap,
        path: KeyPath,
    ) -> Self {
        ListMap {
            doc,
            name_map,
            reverse,
            path,
        }
    }

    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.doc
            .raw
            .borrow()
            .get_path(&self.path)
            .and_then(Value::as_list)
            .map_or(0, <[Value]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the element at `index`.
    ///
    /// # Errors
    /// [`ValueError::IndexOutOfRange`] past the end of the list.
    pub fn get(&self, index: usize) -> Result<Element<'a>> {
        let raw = self.doc.raw.borrow();
        let items = raw
            .get_path(&self.path)
            .and_then(Value::as_list)
            .unwrap_or_default();
        let item = items.get(index).ok_or(ValueError::IndexOutOfRange {
            index,
            len: items.len(),
        })?;
        Ok(match item {
            Value::Doc(_) if !self.name_map.is_empty() => Element::Dict(self.element(index)),
            other => Element::Value(other.clone()),
        })
    }

    fn element(&self, index: usize) -> DictMap<'a> {
        DictMap::new(
            self.doc,
            self.name_map,
            self.reverse,
            self.path.clone().push_index(index),
        )
    }

    /// Appends a new empty embedded document and returns a cursor to it.
    ///
    /// Creates the list if it is not stored yet.
    pub fn new_item(&self) -> Result<DictMap<'a>> {
        let index = {
            let mut raw = self.doc.raw.borrow_mut();
            let items = raw.list_mut(&self.path)?;
            items.push(Value::Doc(Default::default()));
            items.len() - 1
        };
        Ok(self.element(index))
    }

    /// Appends a value, creating the list if needed.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.doc.raw.borrow_mut().list_mut(&self.path)?.push(value.into());
        Ok(())
    }

    /// Replaces the element at `index`.
    ///
    /// # Errors
    /// [`ValueError::IndexOutOfRange`] past the end of the list.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let mut raw = self.doc.raw.borrow_mut();
        let items = raw.list_mut(&self.path)?;
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ValueError::IndexOutOfRange { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    /// [`ValueError::IndexOutOfRange`] past the end of the list.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let mut raw = self.doc.raw.borrow_mut();
        let items = raw.list_mut(&self.path)?;
        if index >= items.len() {
            return Err(ValueError::IndexOutOfRange {
                index,
                len: items.len(),
            }
            .into());
        }
        Ok(items.remove(index))
    }

    /// Every element in order.
    pub fn iter(&self) -> impl Iterator<Item = Element<'a>> + '_ {
        (0..self.len()).filter_map(|index| self.get(index).ok())
    }

    /// A copy of the raw list; empty if it does not exist.
    pub fn to_vec(&self) -> Vec<Value> {
        self.doc
            .raw
            .borrow()
            .get_path(&self.path)
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default()
    }

    /// A copy of the list with embedded documents keyed by attribute names.
    pub fn for_json(&self) -> Vec<Value> {
        mapper::map_list(&self.to_vec(), self.reverse)
    }
}

impl fmt::Debug for ListMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListMap")
            .field("path", &self.path.to_string())
            .field("value", &self.to_vec())
            .finish()
    }
}

impl PartialEq<Vec<Value>> for ListMap<'_> {
    fn eq(&self, other: &Vec<Value>) -> bool {
        self.to_vec() == *other
    }
}

impl PartialEq<serde_json::Value> for ListMap<'_> {
    fn eq(&self, other: &serde_json::Value) -> bool {
        Value::List(self.to_vec()) == *other
    }
}
