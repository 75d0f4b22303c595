use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use shortkey::{
    Document,
    schema::{Embed, SavedDefault, Schema},
};

use crate::helpers::*;

#[test]
fn test_subtype_inherits_bindings_and_storage() {
    let base = post_schema();
    let featured = Schema::builder("FeaturedPost")
        .extends(&base)
        .field("rank", "r")
        .build()
        .expect("Failed to build subtype");

    assert_eq!(featured.key("meta.tag").unwrap(), "m.t");
    assert_eq!(featured.key("rank").unwrap(), "r");
    assert_eq!(featured.namespace().unwrap(), base.namespace().unwrap());
    assert_eq!(featured.indexes(), base.indexes());
    assert!(featured.mapped_attributes().contains(&"_id"));
}

#[test]
fn test_subtype_overrides_a_binding() {
    let base = post_schema();
    let renamed = Schema::builder("Renamed")
        .extends(&base)
        .field("title", "title")
        .embed("meta", Embed::new("md").field("tag", "tg"))
        .collection("renamed")
        .build()
        .expect("Failed to build subtype");

    assert_eq!(renamed.key("title").unwrap(), "title");
    assert_eq!(renamed.key("meta.tag").unwrap(), "md.tg");
    assert!(renamed.key("meta.source").unwrap_err().is_not_found());
    assert_eq!(renamed.namespace().unwrap().collection(), "renamed");
    assert_eq!(renamed.namespace().unwrap().database(), "blog");
}

#[test]
fn test_inherited_saved_default_is_generated_per_document() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let base = Schema::builder("Base")
        .field_with_generator(
            "token",
            "k",
            SavedDefault::new(move || counter.fetch_add(1, Ordering::SeqCst) as i64),
        )
        .build()
        .expect("Failed to build base");
    let child = Schema::builder("Child")
        .extends(&base)
        .field("extra", "x")
        .build()
        .expect("Failed to build child");

    let first = Document::new(&child);
    let second = Document::new(&child);
    assert_eq!(first.get("token").unwrap(), 0);
    assert_eq!(first.get("token").unwrap(), 0);
    assert_eq!(second.get("token").unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_raw(&first, serde_json::json!({"k": 0}));
}

#[test]
fn test_multiple_bases_merge() {
    let named = Schema::builder("Named")
        .field("name", "n")
        .database("first")
        .build()
        .expect("Failed to build base");
    let dated = Schema::builder("Dated")
        .field("name", "nm")
        .field("created", "c")
        .database("second")
        .build()
        .expect("Failed to build base");
    let both = Schema::builder("Both")
        .extends(&named)
        .extends(&dated)
        .collection("both")
        .build()
        .expect("Failed to build schema");

    assert_eq!(both.key("name").unwrap(), "n");
    assert_eq!(both.key("created").unwrap(), "c");
    assert_eq!(both.namespace().unwrap().database(), "first");
}
