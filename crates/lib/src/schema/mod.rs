//! Document type declarations.
//!
//! A [`Schema`] describes one document type: which logical attribute names
//! map to which short storage keys, which attributes have defaults, where the
//! documents are stored, and which indexes the collection carries. Schemas
//! are built once through [`SchemaBuilder`] and shared behind an [`Arc`].
//!
//! ```
//! use shortkey::schema::{Embed, SavedDefault, Schema};
//!
//! let schema = Schema::builder("Post")
//!     .database("blog")
//!     .collection("posts")
//!     .field("user_name", "u")
//!     .field_with_default("views", "v", 0)
//!     .field_with_generator("slug", "s", SavedDefault::new(|| "untitled"))
//!     .embed("meta", Embed::new("m").field("tag", "t"))
//!     .build()?;
//!
//! assert_eq!(schema.key("meta.tag")?, "m.t");
//! assert!(schema.mapped_attributes().contains(&"_id"));
//! # Ok::<(), shortkey::Error>(())
//! ```
//!
//! # Inheritance
//!
//! A schema may extend other schemas. Their bindings, saved defaults, type
//! attributes and storage configuration are inherited; the builder's own
//! declarations always win. When several bases bind the same name, the base
//! passed to [`SchemaBuilder::extends`] first takes precedence.

use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::debug;

use crate::{
    Result,
    backend::Namespace,
    connection::Credentials,
    constants::{CONFIG_PREFIX, ID_KEY, PRIVATE_PREFIX, RESERVED_NAMES},
    value::{Doc, Value},
};

mod embed;
pub mod errors;
mod index;
mod name_map;

pub use embed::Embed;
pub use errors::SchemaError;
pub use index::{Direction, Index};
pub use name_map::{NameMap, ReverseNameMap};

pub(crate) use name_map::EMPTY_REVERSE;

type Generator = dyn Fn() -> Result<Value> + Send + Sync;

/// A generator for a default that is persisted the first time it is read.
///
/// Each document invokes the generator at most once; the produced value is
/// stored in the document and returned from then on.
#[derive(Clone)]
pub struct SavedDefault {
    generator: Arc<Generator>,
}

impl SavedDefault {
    /// Wraps an infallible generator.
    pub fn new<F, V>(generator: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        SavedDefault {
            generator: Arc::new(move || Ok(generator().into())),
        }
    }

    /// Wraps a generator that can fail, e.g. one that talks to storage.
    pub fn try_new<F>(generator: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        SavedDefault {
            generator: Arc::new(generator),
        }
    }

    /// Produces a new value.
    pub fn generate(&self) -> Result<Value> {
        (self.generator)()
    }
}

impl fmt::Debug for SavedDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SavedDefault(..)")
    }
}

/// How a logical attribute name is stored.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Stored under a storage key, no default
    Key(String),
    /// Stored under a storage key, reading as the given value while unset
    KeyWithDefault(String, Value),
    /// Stored under a storage key, generated and persisted on first read
    KeyWithGenerator(String, SavedDefault),
    /// An embedded sub-document
    Embed(Embed),
}

impl From<&str> for Binding {
    fn from(key: &str) -> Self {
        Binding::Key(key.to_string())
    }
}

impl From<String> for Binding {
    fn from(key: String) -> Self {
        Binding::Key(key)
    }
}

impl From<Embed> for Binding {
    fn from(embed: Embed) -> Self {
        Binding::Embed(embed)
    }
}

/// A built document type.
#[derive(Debug)]
pub struct Schema {
    name: String,
    database: Option<String>,
    collection: Option<String>,
    auth: Option<Credentials>,
    declared_indexes: Vec<Index>,
    indexes: Vec<Index>,
    name_map: NameMap,
    reverse_name_map: ReverseNameMap,
    saved_defaults: BTreeMap<String, SavedDefault>,
    attributes: BTreeMap<String, Value>,
    indexes_ensured: AtomicBool,
}

impl Schema {
    /// Starts declaring a document type called `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The storage address of this type's collection.
    ///
    /// # Errors
    /// A configuration error if either the database or the collection name
    /// is missing.
    pub fn namespace(&self) -> Result<Namespace> {
        let missing = |setting: &str| SchemaError::MissingConfig {
            schema: self.name.clone(),
            setting: setting.to_string(),
        };
        let database = self.database.clone().ok_or_else(|| missing("a database"))?;
        let collection = self
            .collection
            .clone()
            .ok_or_else(|| missing("a collection"))?;
        Ok(Namespace::new(database, collection))
    }

    /// Credentials this type authenticates with, if any.
    pub fn auth(&self) -> Option<&Credentials> {
        self.auth.as_ref()
    }

    /// Indexes with attribute names resolved to dotted storage keys.
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn name_map(&self) -> &NameMap {
        &self.name_map
    }

    pub fn reverse_name_map(&self) -> &ReverseNameMap {
        &self.reverse_name_map
    }

    /// Saved-default generators keyed by top-level storage key.
    pub fn saved_defaults(&self) -> &BTreeMap<String, SavedDefault> {
        &self.saved_defaults
    }

    /// A type-level attribute. These are shared by every document of the
    /// type and never stored.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Resolves a dotted logical path to its dotted storage key, e.g.
    /// `"meta.tag"` → `"m.t"`. Useful for building queries.
    pub fn key(&self, name: &str) -> Result<&str> {
        self.name_map
            .resolve(name)
            .map(NameMap::path)
            .ok_or_else(|| {
                SchemaError::NotMapped {
                    schema: self.name.clone(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Top-level storage keys in use.
    pub fn mapped_keys(&self) -> Vec<&str> {
        self.reverse_name_map.mapped().collect()
    }

    /// Top-level logical attribute names.
    pub fn mapped_attributes(&self) -> Vec<&str> {
        self.name_map.mapped().collect()
    }

    /// Generates and stores every saved default missing from `doc`.
    pub fn apply_saved_defaults(&self, doc: &mut Doc) -> Result<()> {
        for (key, generator) in &self.saved_defaults {
            if doc.contains_key(key) {
                continue;
            }
            let value = generator.generate()?;
            debug!(schema = %self.name, key = %key, "Persisting saved default");
            doc.insert(key.clone(), value);
        }
        Ok(())
    }

    /// Forgets that indexes were ensured, so the next collection operation
    /// ensures them again. Call this after reconfiguring storage.
    pub fn reset_indexes(&self) {
        self.indexes_ensured.store(false, Ordering::Release);
    }

    pub(crate) fn indexes_ensured(&self) -> bool {
        self.indexes_ensured.load(Ordering::Acquire)
    }

    pub(crate) fn mark_indexes_ensured(&self) {
        self.indexes_ensured.store(true, Ordering::Release);
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    bases: Vec<Arc<Schema>>,
    database: Option<String>,
    collection: Option<String>,
    auth: Option<String>,
    indexes: Option<Vec<Index>>,
    bindings: Vec<(String, Binding)>,
    attributes: Vec<(String, Value)>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaBuilder {
            name: name.into(),
            bases: Vec::new(),
            database: None,
            collection: None,
            auth: None,
            indexes: None,
            bindings: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Inherits from an already built schema.
    pub fn extends(mut self, base: &Arc<Schema>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Credentials in `"user:password"` form.
    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Adds an index. Declaring any index replaces inherited indexes.
    pub fn index(mut self, index: impl Into<Index>) -> Self {
        self.indexes.get_or_insert_with(Vec::new).push(index.into());
        self
    }

    /// Binds `name` however `binding` describes.
    pub fn bind(mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.bindings.push((name.into(), binding.into()));
        self
    }

    pub fn field(self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.bind(name, Binding::Key(key.into()))
    }

    pub fn field_with_default(
        self,
        name: impl Into<String>,
        key: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        self.bind(name, Binding::KeyWithDefault(key.into(), default.into()))
    }

    pub fn field_with_generator(
        self,
        name: impl Into<String>,
        key: impl Into<String>,
        generator: impl Into<SavedDefault>,
    ) -> Self {
        self.bind(name, Binding::KeyWithGenerator(key.into(), generator.into()))
    }

    pub fn embed(self, name: impl Into<String>, embed: Embed) -> Self {
        self.bind(name, Binding::Embed(embed))
    }

    /// Declares a type-level attribute that is never stored.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let SchemaBuilder {
            name: schema,
            bases,
            database,
            collection,
            auth,
            indexes,
            mut bindings,
            attributes: own_attributes,
        } = self;

        for name in bindings
            .iter()
            .map(|(name, _)| name)
            .chain(own_attributes.iter().map(|(name, _)| name))
        {
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(SchemaError::ReservedName {
                    schema,
                    name: name.clone(),
                }
                .into());
            }
        }

        let mut name_map = NameMap::root();
        let mut reverse_name_map = ReverseNameMap::root();
        let mut saved_defaults = BTreeMap::new();
        let mut attributes = BTreeMap::new();
        for base in bases.iter().rev() {
            name_map.merge(&base.name_map);
            reverse_name_map.merge(&base.reverse_name_map);
            saved_defaults.extend(
                base.saved_defaults
                    .iter()
                    .map(|(key, generator)| (key.clone(), generator.clone())),
            );
            attributes.extend(
                base.attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }

        if !name_map.contains(ID_KEY) && !bindings.iter().any(|(name, _)| name == ID_KEY) {
            bindings.push((ID_KEY.to_string(), Binding::Key(ID_KEY.to_string())));
        }

        for (name, binding) in bindings {
            if name.starts_with(CONFIG_PREFIX)
                || (name.starts_with(PRIVATE_PREFIX) && name != ID_KEY)
            {
                debug!(schema = %schema, name = %name, "Skipping unmapped declaration");
                continue;
            }

            match &binding {
                Binding::Key(key)
                | Binding::KeyWithDefault(key, _)
                | Binding::KeyWithGenerator(key, _) => embed::check_key(&name, key)?,
                Binding::Embed(embed) => embed.check_keys(&name)?,
            }

            // A shadowed binding's generator and reverse entry go with it
            if let Some(shadowed) = name_map.get(&name) {
                saved_defaults.remove(shadowed.key());
                if reverse_name_map
                    .get(shadowed.key())
                    .is_some_and(|reverse| reverse.name() == name)
                {
                    reverse_name_map.remove(shadowed.key());
                }
            }

            let (node, reverse) = match binding {
                Binding::Key(key) => (NameMap::at(key), ReverseNameMap::named(&name)),
                Binding::KeyWithDefault(key, default) => (
                    NameMap::at(key).with_default(default),
                    ReverseNameMap::named(&name),
                ),
                Binding::KeyWithGenerator(key, generator) => {
                    saved_defaults.insert(key.clone(), generator);
                    (NameMap::at(key), ReverseNameMap::named(&name))
                }
                Binding::Embed(embed) => (
                    embed.as_name_map(embed.key()),
                    embed.as_reverse_name_map(&name),
                ),
            };
            reverse_name_map.insert(node.key(), reverse);
            name_map.insert(name, node);
        }

        attributes.extend(own_attributes);

        let database = database.or_else(|| bases.iter().find_map(|base| base.database.clone()));
        let collection =
            collection.or_else(|| bases.iter().find_map(|base| base.collection.clone()));
        let auth = match auth {
            Some(auth) => Some(Credentials::from_str(&auth)?),
            None => bases.iter().find_map(|base| base.auth.clone()),
        };
        let declared_indexes = indexes
            .or_else(|| {
                bases
                    .iter()
                    .find(|base| !base.declared_indexes.is_empty())
                    .map(|base| base.declared_indexes.clone())
            })
            .unwrap_or_default();
        let indexes = declared_indexes
            .iter()
            .map(|index| index.resolve(&name_map, &attributes))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            schema = %schema,
            mapped = name_map.mapped().count(),
            saved_defaults = saved_defaults.len(),
            indexes = indexes.len(),
            "Built document schema"
        );

        Ok(Arc::new(Schema {
            name: schema,
            database,
            collection,
            auth,
            declared_indexes,
            indexes,
            name_map,
            reverse_name_map,
            saved_defaults,
            attributes,
            indexes_ensured: AtomicBool::new(false),
        }))
    }
}
