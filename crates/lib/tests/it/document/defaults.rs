use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use shortkey::{
    Collection, Document,
    backend::Backend,
    schema::{SavedDefault, Schema},
    value::Doc,
};

use crate::helpers::*;

fn counted_schema(calls: Arc<AtomicUsize>) -> Arc<Schema> {
    Schema::builder("Counted")
        .database("db")
        .collection("counted")
        .field_with_default("val", "v", 2)
        .field_with_generator(
            "saved",
            "s",
            SavedDefault::new(move || calls.fetch_add(1, Ordering::SeqCst) as i64 + 1),
        )
        .build()
        .expect("Failed to build schema")
}

// ===== STATIC DEFAULTS =====

#[test]
fn test_static_defaults_are_read_but_not_stored() {
    let schema = post_schema();
    let post = Document::new(&schema);

    assert_eq!(post.get("views").unwrap(), 0);
    assert!(!post.contains_key("v"));

    post.set("views", 10);
    assert_eq!(post.get("views").unwrap(), 10);
    post.delete("views").unwrap();
    assert_eq!(post.get("views").unwrap(), 0);
}

#[test]
fn test_defaults_appear_in_json() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = counted_schema(calls.clone());
    let item = Document::new(&schema);

    assert_logical(&item, json!({"val": 2, "saved": 1}));
    // The saved default is now part of the document, the static one is not
    assert_raw(&item, json!({"s": 1}));
    assert_eq!(item.get("saved").unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ===== SAVED DEFAULTS =====

#[test]
fn test_saved_default_is_persisted_on_first_read() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = counted_schema(calls.clone());
    let item = Document::new(&schema);

    assert_eq!(item.get("saved").unwrap(), 1);
    assert_eq!(item.get("saved").unwrap(), 1);
    assert_raw(&item, json!({"s": 1}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stored_value_beats_saved_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = counted_schema(calls.clone());
    let item = Document::from_raw(&schema, doc(json!({"s": 99})));

    assert_eq!(item.get("saved").unwrap(), 99);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_saved_defaults_are_set_on_insert_and_save() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = counted_schema(calls.clone());
    let (connection, backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let counted = Collection::new(&schema).expect("Failed to open collection");

    let inserted = Document::new(&schema);
    counted.insert(&inserted).expect("Failed to insert");
    let saved = Document::new(&schema);
    counted.save(&saved).expect("Failed to save");

    assert_eq!(inserted.get_key("s"), Some(1.into()));
    assert_eq!(saved.get_key("s"), Some(2.into()));

    let stored = backend
        .find(counted.namespace(), &Doc::new())
        .expect("Failed to read storage");
    let values: Vec<_> = stored.iter().map(|raw| raw.get("s").cloned()).collect();
    assert_eq!(values, vec![Some(1.into()), Some(2.into())]);
    assert!(stored.iter().all(|raw| !raw.contains_key("v")));

    // Saving again keeps the generated value
    counted.save(&saved).expect("Failed to save again");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failing_generator_surfaces_on_read() {
    let schema = Schema::builder("Failing")
        .field_with_generator(
            "broken",
            "b",
            SavedDefault::try_new(|| Err(std::io::Error::other("generator failed").into())),
        )
        .build()
        .expect("Failed to build schema");
    let item = Document::new(&schema);

    assert!(item.get("broken").unwrap_err().is_io_error());
    assert!(item.for_json().unwrap_err().is_io_error());
    assert!(item.is_empty());
}
