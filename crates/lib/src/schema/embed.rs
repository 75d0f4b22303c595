//! Declarations of embedded sub-documents.

use tracing::debug;

use super::{
    SchemaError,
    name_map::{NameMap, ReverseNameMap},
};
use crate::constants::PRIVATE_PREFIX;

/// An embedded sub-document stored under a single short key.
///
/// Fields of an embed map attribute names to keys inside the sub-document;
/// embeds nest to any depth.
///
/// ```
/// # use shortkey::schema::Embed;
/// let meta = Embed::new("m")
///     .field("tag", "t")
///     .embed("source", Embed::new("s").field("url", "u"));
/// assert_eq!(meta.key(), "m");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    key: String,
    fields: Vec<(String, EmbedField)>,
}

#[derive(Debug, Clone, PartialEq)]
enum EmbedField {
    Key(String),
    Embed(Embed),
}

impl Embed {
    /// Declares an embedded document stored under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Embed {
            key: key.into(),
            fields: Vec::new(),
        }
    }

    /// Maps the attribute `name` to the storage `key` inside this embed.
    pub fn field(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.fields.push((name.into(), EmbedField::Key(key.into())));
        self
    }

    /// Nests another embedded document under the attribute `name`.
    pub fn embed(mut self, name: impl Into<String>, embed: Embed) -> Self {
        self.fields.push((name.into(), EmbedField::Embed(embed)));
        self
    }

    /// The storage key of this embed within its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Checks this embed's key and every key beneath it. `name` is the
    /// dotted attribute path of the embed, used in errors.
    pub(crate) fn check_keys(&self, name: &str) -> Result<(), SchemaError> {
        check_key(name, &self.key)?;
        for (child_name, field) in self.public_fields() {
            let path = format!("{name}.{child_name}");
            match field {
                EmbedField::Key(key) => check_key(&path, key)?,
                EmbedField::Embed(embed) => embed.check_keys(&path)?,
            }
        }
        Ok(())
    }

    /// Builds the name map node for this embed, rooted at the dotted storage
    /// path `base`.
    pub fn as_name_map(&self, base: &str) -> NameMap {
        let mut node = NameMap::at(base);
        for (name, field) in self.public_fields() {
            let child = match field {
                EmbedField::Key(key) => NameMap::at(format!("{base}.{key}")),
                EmbedField::Embed(embed) => embed.as_name_map(&format!("{base}.{}", embed.key)),
            };
            node.insert(name, child);
        }
        node
    }

    /// Builds the reverse node for this embed, producing the attribute `name`.
    pub fn as_reverse_name_map(&self, name: &str) -> ReverseNameMap {
        let mut node = ReverseNameMap::named(name);
        for (child_name, field) in self.public_fields() {
            let (key, child) = match field {
                EmbedField::Key(key) => (key.as_str(), ReverseNameMap::named(child_name)),
                EmbedField::Embed(embed) => (embed.key(), embed.as_reverse_name_map(child_name)),
            };
            node.insert(key, child);
        }
        node
    }

    fn public_fields(&self) -> impl Iterator<Item = (&str, &EmbedField)> {
        self.fields.iter().filter_map(|(name, field)| {
            if name.starts_with(PRIVATE_PREFIX) {
                debug!(embed = %self.key, name = %name, "Skipping private embed attribute");
                return None;
            }
            Some((name.as_str(), field))
        })
    }
}

/// A storage key must address exactly one map entry.
pub(crate) fn check_key(name: &str, key: &str) -> Result<(), SchemaError> {
    if key.is_empty() || key.contains('.') {
        return Err(SchemaError::InvalidKey {
            name: name.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}
