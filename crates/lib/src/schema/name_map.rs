//! Attribute name ↔ storage key trees.
//!
//! A [`NameMap`] translates logical attribute names to storage keys. Each
//! node carries the short key it stores under, the full dotted storage path
//! from the document root, an optional static default, and child nodes for
//! embedded structure. The [`ReverseNameMap`] is the mirror image, keyed by
//! storage key and producing attribute names, and is what output mapping
//! walks.

use std::collections::BTreeMap;

use crate::value::Value;

/// Node of the logical name → storage key tree.
///
/// The root node of a schema has an empty key and path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameMap {
    key: String,
    path: String,
    default: Option<Value>,
    children: BTreeMap<String, NameMap>,
}

impl NameMap {
    /// Creates the root node of a name map.
    pub const fn root() -> Self {
        NameMap {
            key: String::new(),
            path: String::new(),
            default: None,
            children: BTreeMap::new(),
        }
    }

    /// Creates a node for the dotted storage `path`. Its key is the last
    /// path component.
    pub fn at(path: impl Into<String>) -> Self {
        let path = path.into();
        let key = path.rsplit('.').next().unwrap_or_default().to_string();
        NameMap {
            key,
            path,
            ..Self::root()
        }
    }

    pub(crate) fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The storage key this node is stored under within its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The full dotted storage path from the document root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The static default returned when nothing is stored under this node.
    pub fn static_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns true if this node has no mapped children.
    ///
    /// Values under an empty node are returned as plain values rather than
    /// wrapped in a mapping proxy.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&NameMap> {
        self.children.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Iterates over the mapped attribute names at this level.
    pub fn mapped(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NameMap)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, node: NameMap) -> Option<NameMap> {
        self.children.insert(name.into(), node)
    }

    /// Copies every child of `other` into this node, replacing children with
    /// the same name.
    pub fn merge(&mut self, other: &NameMap) {
        self.children
            .extend(other.children.iter().map(|(name, node)| (name.clone(), node.clone())));
    }

    /// Follows a dotted logical path (`"meta.tag"`) down the tree.
    pub fn resolve(&self, dotted: &str) -> Option<&NameMap> {
        dotted
            .split('.')
            .try_fold(self, |node, name| node.children.get(name))
    }
}

/// Node of the storage key → logical name tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReverseNameMap {
    name: String,
    children: BTreeMap<String, ReverseNameMap>,
}

/// Reverse node used where a mapped value has no reverse structure.
pub(crate) static EMPTY_REVERSE: ReverseNameMap = ReverseNameMap::root();

impl ReverseNameMap {
    pub const fn root() -> Self {
        ReverseNameMap {
            name: String::new(),
            children: BTreeMap::new(),
        }
    }

    /// Creates a node producing the attribute `name`.
    pub fn named(name: impl Into<String>) -> Self {
        ReverseNameMap {
            name: name.into(),
            children: BTreeMap::new(),
        }
    }

    /// The attribute name this storage key maps back to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ReverseNameMap> {
        self.children.get(key)
    }

    /// Iterates over the mapped storage keys at this level.
    pub fn mapped(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub(crate) fn insert(
        &mut self,
        key: impl Into<String>,
        node: ReverseNameMap,
    ) -> Option<ReverseNameMap> {
        self.children.insert(key.into(), node)
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<ReverseNameMap> {
        self.children.remove(key)
    }

    pub fn merge(&mut self, other: &ReverseNameMap) {
        self.children
            .extend(other.children.iter().map(|(key, node)| (key.clone(), node.clone())));
    }
}
