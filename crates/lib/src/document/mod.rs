//! Documents and attribute access.
//!
//! A [`Document`] wraps the raw short-keyed [`Doc`] that gets stored and
//! exposes it through the logical attribute names of its [`Schema`]. Reading
//! an attribute yields an [`Attr`]: plain values are returned as snapshots,
//! while embedded maps and lists come back as [`DictMap`] and [`ListMap`]
//! cursors that read and write the document in place.
//!
//! ```
//! use shortkey::{document::Document, schema::{Embed, Schema}};
//!
//! let schema = Schema::builder("Post")
//!     .field("user_name", "u")
//!     .embed("meta", Embed::new("m").field("tag", "t"))
//!     .build()?;
//!
//! let post = Document::new(&schema);
//! post.set("user_name", "alice");
//! post.get("meta")?.into_dict()?.set("tag", "rust")?;
//!
//! assert_eq!(post, serde_json::json!({"u": "alice", "m": {"t": "rust"}}));
//! assert_eq!(post.for_json()?, serde_json::json!({"user_name": "alice", "meta": {"tag": "rust"}}));
//! # Ok::<(), shortkey::Error>(())
//! ```

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use tracing::debug;

use crate::{
    Result,
    schema::{EMPTY_REVERSE, NameMap, ReverseNameMap, Schema},
    value::{Doc, KeyPath, Value, ValueError},
};

mod dict_map;
pub mod errors;
mod list_map;
pub(crate) mod mapper;

pub use dict_map::DictMap;
pub use errors::DocumentError;
pub use list_map::{Element, ListMap};

/// A stored document of one [`Schema`].
///
/// Attribute access goes through `&self`; the raw storage map lives in a
/// [`RefCell`] so that cursors returned by [`Document::get`] can write back
/// into it. Borrows never outlive a single call, so any mix of cursors and
/// writes is allowed. Documents are confined to one thread at a time.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    raw: RefCell<Doc>,
    extras: RefCell<BTreeMap<String, Value>>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self::from_raw(schema, Doc::new())
    }

    /// Wraps a raw, short-keyed document as loaded from storage.
    pub fn from_raw(schema: &Arc<Schema>, raw: Doc) -> Self {
        Document {
            schema: Arc::clone(schema),
            raw: RefCell::new(raw),
            extras: RefCell::default(),
        }
    }

    /// Builds a document from attribute names, e.g. parsed JSON input.
    ///
    /// Unmapped names are kept as raw keys.
    pub fn from_logical(schema: &Arc<Schema>, logical: &Doc) -> Self {
        Self::from_raw(schema, mapper::unmap_doc(logical, schema.name_map()))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Reads the attribute `name`.
    ///
    /// Mapped attributes resolve to the stored value, the attribute's static
    /// default, a generated saved default (which is stored), an unmaterialized
    /// [`DictMap`] for embeds, or [`Attr::Unset`]. Unmapped names resolve to
    /// values set on this document and then to type attributes.
    ///
    /// # Errors
    /// [`DocumentError::AttributeNotFound`] for unknown unmapped names, or
    /// the error of a failing saved-default generator.
    pub fn get(&self, name: &str) -> Result<Attr<'_>> {
        let schema: &Schema = &self.schema;
        let Some(node) = schema.name_map().get(name) else {
            return self.get_unmapped(name);
        };
        let reverse = schema
            .reverse_name_map()
            .get(node.key())
            .unwrap_or(&EMPTY_REVERSE);
        let path = KeyPath::new().push_key(node.key());

        if let Some(attr) = Attr::resolve(self, node, reverse, &path) {
            return Ok(attr);
        }
        if let Some(generator) = schema.saved_defaults().get(node.key()) {
            let value = generator.generate()?;
            debug!(schema = %schema.name(), key = %node.key(), "Persisting saved default");
            self.raw.borrow_mut().insert(node.key(), value);
            if let Some(attr) = Attr::resolve(self, node, reverse, &path) {
                return Ok(attr);
            }
        }
        Ok(Attr::absent(self, node, reverse, path))
    }

    fn get_unmapped(&self, name: &str) -> Result<Attr<'_>> {
        if let Some(value) = self.extras.borrow().get(name) {
            return Ok(Attr::Value(value.clone()));
        }
        if let Some(value) = self.schema.attribute(name) {
            return Ok(Attr::Value(value.clone()));
        }
        Err(DocumentError::AttributeNotFound {
            schema: self.schema.name().to_string(),
            name: name.to_string(),
        }
        .into())
    }

    /// Sets the attribute `name`.
    ///
    /// Mapped attributes are stored under their key. Anything else becomes
    /// an ordinary value on this document that is never persisted.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        match self.schema.name_map().get(name) {
            Some(node) => {
                self.raw.borrow_mut().insert(node.key(), value);
            }
            None => {
                self.extras.borrow_mut().insert(name.to_string(), value.into());
            }
        }
    }

    /// Deletes the attribute `name`.
    ///
    /// Deleting a mapped attribute that is not stored does nothing.
    ///
    /// # Errors
    /// [`DocumentError::AttributeNotFound`] if `name` is unmapped and was
    /// never set on this document.
    pub fn delete(&self, name: &str) -> Result<()> {
        if let Some(node) = self.schema.name_map().get(name) {
            self.raw.borrow_mut().remove(node.key());
            return Ok(());
        }
        if self.extras.borrow_mut().remove(name).is_some() {
            return Ok(());
        }
        Err(DocumentError::AttributeNotFound {
            schema: self.schema.name().to_string(),
            name: name.to_string(),
        }
        .into())
    }

    /// A cursor over the embedded map stored under `name`.
    ///
    /// The map does not need to exist yet; writing through the cursor
    /// creates it.
    ///
    /// # Errors
    /// An attribute error if `name` is unmapped, or a type error if a
    /// non-map value is stored under it.
    pub fn dict(&self, name: &str) -> Result<DictMap<'_>> {
        let (node, reverse, path) = self.mapped(name)?;
        match self.raw.borrow().get_path(&path) {
            None | Some(Value::Doc(_)) => {}
            Some(other) => return Err(ValueError::mismatch("Doc", other.type_name()).into()),
        }
        Ok(DictMap::new(self, node, reverse, path))
    }

    /// A cursor over the list stored under `name`.
    ///
    /// # Errors
    /// An attribute error if `name` is unmapped, or a type error if a
    /// non-list value is stored under it.
    pub fn list(&self, name: &str) -> Result<ListMap<'_>> {
        let (node, reverse, path) = self.mapped(name)?;
        match self.raw.borrow().get_path(&path) {
            None | Some(Value::List(_)) => {}
            Some(other) => return Err(ValueError::mismatch("List", other.type_name()).into()),
        }
        Ok(ListMap::new(self, node, reverse, path))
    }

    fn mapped(&self, name: &str) -> Result<(&NameMap, &ReverseNameMap, KeyPath)> {
        let node = self.schema.name_map().get(name).ok_or_else(|| {
            DocumentError::AttributeNotFound {
                schema: self.schema.name().to_string(),
                name: name.to_string(),
            }
        })?;
        let reverse = self
            .schema
            .reverse_name_map()
            .get(node.key())
            .unwrap_or(&EMPTY_REVERSE);
        Ok((node, reverse, KeyPath::new().push_key(node.key())))
    }

    /// A copy of the raw stored document.
    pub fn to_doc(&self) -> Doc {
        self.raw.borrow().clone()
    }

    pub fn into_raw(self) -> Doc {
        self.raw.into_inner()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw.borrow().contains_key(key)
    }

    /// Reads a raw storage key.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        self.raw.borrow().get(key).cloned()
    }

    /// Writes a raw storage key, bypassing the name map.
    pub fn set_key(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.raw.borrow_mut().insert(key, value)
    }

    pub fn remove_key(&self, key: &str) -> Option<Value> {
        self.raw.borrow_mut().remove(key)
    }

    pub fn len(&self) -> usize {
        self.raw.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.borrow().is_empty()
    }

    /// Generates and stores every saved default this document lacks.
    pub fn ensure_saved_defaults(&self) -> Result<()> {
        self.schema.apply_saved_defaults(&mut self.raw.borrow_mut())
    }

    /// A copy of this document keyed by attribute names.
    ///
    /// Saved defaults are generated and persisted first. Static defaults of
    /// absent attributes are included; unmapped keys pass through as-is.
    pub fn for_json(&self) -> Result<Doc> {
        self.ensure_saved_defaults()?;
        let mut out: Doc = self
            .schema
            .name_map()
            .iter()
            .filter_map(|(name, node)| {
                node.static_default()
                    .map(|default| (name.to_string(), default.clone()))
            })
            .collect();
        let mapped = mapper::map_doc(&self.raw.borrow(), self.schema.reverse_name_map());
        for (name, value) in mapped {
            out.insert(name, value);
        }
        Ok(out)
    }

    /// [`Document::for_json`] as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.for_json()?.to_json())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        *self.raw.borrow() == *other.raw.borrow()
    }
}

impl PartialEq<Doc> for Document {
    fn eq(&self, other: &Doc) -> bool {
        *self.raw.borrow() == *other
    }
}

impl PartialEq<serde_json::Value> for Document {
    fn eq(&self, other: &serde_json::Value) -> bool {
        *self.raw.borrow() == *other
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.schema.name(), self.raw.borrow())
    }
}

/// The result of reading an attribute.
#[derive(Debug)]
pub enum Attr<'a> {
    /// A snapshot of a stored or default value
    Value(Value),
    /// An embedded map, read and written in place
    Dict(DictMap<'a>),
    /// A list whose embedded documents are mapped
    List(ListMap<'a>),
    /// A mapped attribute with nothing stored and no default
    Unset,
}

impl<'a> Attr<'a> {
    /// Resolves the value stored at `path`, if any.
    ///
    /// Maps and lists are only wrapped in cursors when `node` maps names
    /// beneath them.
    pub(crate) fn resolve(
        doc: &'a Document,
        node: &'a NameMap,
        reverse: &'a ReverseNameMap,
        path: &KeyPath,
    ) -> Option<Attr<'a>> {
        let raw = doc.raw.borrow();
        let attr = match raw.get_path(path)? {
            Value::Doc(_) if !node.is_empty() => {
                Attr::Dict(DictMap::new(doc, node, reverse, path.clone()))
            }
            Value::List(_) if !node.is_empty() => {
                Attr::List(ListMap::new(doc, node, reverse, path.clone()))
            }
            value => Attr::Value(value.clone()),
        };
        Some(attr)
    }

    /// The attribute for a mapped name with nothing stored at `path`.
    pub(crate) fn absent(
        doc: &'a Document,
        node: &'a NameMap,
        reverse: &'a ReverseNameMap,
        path: KeyPath,
    ) -> Attr<'a> {
        if let Some(default) = node.static_default() {
            Attr::Value(default.clone())
        } else if !node.is_empty() {
            Attr::Dict(DictMap::new(doc, node, reverse, path))
        } else {
            Attr::Unset
        }
    }

    /// A snapshot of the attribute's current value.
    ///
    /// Unmaterialized maps and unset attributes have no value.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Attr::Value(value) => Some(value.clone()),
            Attr::Dict(dict) => dict.is_materialized().then(|| Value::Doc(dict.to_doc())),
            Attr::List(list) => Some(Value::List(list.to_vec())),
            Attr::Unset => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attr::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Unwraps an embedded map cursor.
    ///
    /// # Errors
    /// A type error for any other kind of attribute.
    pub fn into_dict(self) -> Result<DictMap<'a>> {
        match self {
            Attr::Dict(dict) => Ok(dict),
            other => Err(ValueError::mismatch("DictMap", other.kind()).into()),
        }
    }

    /// Unwraps a list cursor.
    ///
    /// # Errors
    /// A type error for any other kind of attribute.
    pub fn into_list(self) -> Result<ListMap<'a>> {
        match self {
            Attr::List(list) => Ok(list),
            other => Err(ValueError::mismatch("ListMap", other.kind()).into()),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Attr::Unset)
    }

    /// A short description of the attribute kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Attr::Value(value) => value.type_name(),
            Attr::Dict(_) => "DictMap",
            Attr::List(_) => "ListMap",
            Attr::Unset => "Unset",
        }
    }
}

impl<T> PartialEq<T> for Attr<'_>
where
    Value: PartialEq<T>,
{
    fn eq(&self, other: &T) -> bool {
        self.to_value().is_some_and(|value| value == *other)
    }
}
