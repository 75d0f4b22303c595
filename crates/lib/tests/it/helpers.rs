use std::sync::Arc;

use shortkey::{
    Connection, ConnectionConfig, Document, Schema,
    backend::InMemory,
    schema::{Embed, Index, SavedDefault},
    value::Doc,
};

// ==========================
// CORE TEST FACTORIES
// ==========================

/// Creates a connection over a fresh InMemory backend.
///
/// The backend handle is returned as well so tests can inspect raw storage.
pub fn setup_connection() -> (Connection, Arc<InMemory>) {
    setup_connection_with(ConnectionConfig::default())
}

pub fn setup_connection_with(config: ConnectionConfig) -> (Connection, Arc<InMemory>) {
    let backend = Arc::new(InMemory::new());
    let connection =
        Connection::new(config, backend.clone()).expect("Failed to create connection");
    (connection, backend)
}

/// A blog post type exercising every kind of binding.
///
/// ```text
/// title        -> t
/// views        -> v   (static default 0)
/// slug         -> s   (saved default "draft")
/// meta         -> m   { tag -> t, source -> s { url -> u } }
/// comments     -> c   [ { author -> a, body -> b } ]
/// ```
pub fn post_schema() -> Arc<Schema> {
    Schema::builder("Post")
        .database("blog")
        .collection("posts")
        .field("title", "t")
        .field_with_default("views", "v", 0)
        .field_with_generator("slug", "s", SavedDefault::new(|| "draft"))
        .embed(
            "meta",
            Embed::new("m")
                .field("tag", "t")
                .embed("source", Embed::new("s").field("url", "u")),
        )
        .embed(
            "comments",
            Embed::new("c").field("author", "a").field("body", "b"),
        )
        .index(Index::new("meta.tag"))
        .build()
        .expect("Failed to build post schema")
}

/// Builds a raw document from JSON.
pub fn doc(value: serde_json::Value) -> Doc {
    Doc::try_from(value).expect("JSON should be an object")
}

// ==========================
// ASSERTION HELPERS
// ==========================

/// Asserts the raw stored form of `document`.
pub fn assert_raw(document: &Document, expected: serde_json::Value) {
    assert_eq!(
        document.to_doc(),
        expected,
        "raw document of {}",
        document.schema().name()
    );
}

/// Asserts the logical (attribute name) form of `document`.
pub fn assert_logical(document: &Document, expected: serde_json::Value) {
    let logical = document.for_json().expect("Failed to map document");
    assert_eq!(logical, expected, "logical document of {}", document.schema().name());
}
