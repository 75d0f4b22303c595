//! Translation between storage keys and attribute names.
//!
//! Output mapping walks a [`ReverseNameMap`] and renames every mapped key,
//! descending into lists so that documents stored inside lists are mapped
//! too. Unmapped keys pass through untouched. Input mapping is the inverse,
//! walking a [`NameMap`].

use crate::{
    schema::{NameMap, ReverseNameMap},
    value::{Doc, Value},
};

/// Renames storage keys in `doc` to attribute names.
pub(crate) fn map_doc(doc: &Doc, reverse: &ReverseNameMap) -> Doc {
    doc.iter()
        .map(|(key, value)| match reverse.get(key) {
            Some(child) => (child.name().to_string(), map_value(value, child)),
            None => (key.clone(), value.clone()),
        })
        .collect()
}

/// Maps every document found in `items`, at any list depth.
pub(crate) fn map_list(items: &[Value], reverse: &ReverseNameMap) -> Vec<Value> {
    items.iter().map(|item| map_value(item, reverse)).collect()
}

fn map_value(value: &Value, reverse: &ReverseNameMap) -> Value {
    match value {
        Value::Doc(doc) => Value::Doc(map_doc(doc, reverse)),
        Value::List(items) => Value::List(map_list(items, reverse)),
        other => other.clone(),
    }
}

/// Renames attribute names in `doc` to storage keys.
pub(crate) fn unmap_doc(doc: &Doc, name_map: &NameMap) -> Doc {
    doc.iter()
        .map(|(name, value)| match name_map.get(name) {
            Some(node) => (node.key().to_string(), unmap_value(value, node)),
            None => (name.clone(), value.clone()),
        })
        .collect()
}

fn unmap_value(value: &Value, node: &NameMap) -> Value {
    match value {
        Value::Doc(doc) => Value::Doc(unmap_doc(doc, node)),
        Value::List(items) => Value::List(items.iter().map(|item| unmap_value(item, node)).collect()),
        other => other.clone(),
    }
}
