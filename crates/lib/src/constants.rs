//! Constants used throughout the shortkey library.
//!
//! Central definitions for reserved attribute names, well-known storage keys
//! and option defaults.

/// Storage key of the document identifier. Always mapped to itself.
pub const ID_KEY: &str = "_id";

/// Prefix marking a declaration as private; such names are never mapped.
pub const PRIVATE_PREFIX: char = '_';

/// Attribute names that collide with collection or map operations and so
/// cannot be declared on a document type.
pub const RESERVED_NAMES: &[&str] = &[
    // Collection operations
    "aggregate",
    "collection",
    "count",
    "create_index",
    "create_indexes",
    "delete_many",
    "delete_one",
    "distinct",
    "drop",
    "drop_index",
    "drop_indexes",
    "ensure_index",
    "find",
    "find_and_modify",
    "find_one",
    "index_information",
    "insert",
    "insert_many",
    "map_reduce",
    "options",
    "remove",
    "rename",
    "save",
    "update",
    // Map operations
    "clear",
    "copy",
    "fromkeys",
    "get",
    "has_key",
    "items",
    "keys",
    "pop",
    "popitem",
    "setdefault",
    "values",
];

/// Prefix of storage configuration names (`config_database`,
/// `config_collection`, ...). These configure a document type and are never
/// mapped to storage keys.
pub const CONFIG_PREFIX: &str = "config_";

/// Default field incremented by counters.
pub const DEFAULT_COUNTER_FIELD: &str = "value";

/// Default number of seconds an ensured index is considered fresh.
pub const DEFAULT_INDEX_CACHE_SECS: u64 = 86_400;
