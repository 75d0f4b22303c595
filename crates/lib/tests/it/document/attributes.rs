use serde_json::json;

use shortkey::{
    Collection, Document, Error, Value,
    document::DocumentError,
    schema::Schema,
    value::Doc,
};

use crate::helpers::*;

// ===== MAPPED ATTRIBUTES =====

#[test]
fn test_attributes_are_stored_under_short_keys() {
    let schema = post_schema();
    let post = Document::new(&schema);

    post.set("title", "Hello");
    post.set("_id", "post-1");

    assert_raw(&post, json!({"t": "Hello", "_id": "post-1"}));
    assert_eq!(post.get("title").unwrap(), "Hello");
    assert_eq!(post.get_key("t"), Some(Value::from("Hello")));
    assert!(post.contains_key("_id"));
}

#[test]
fn test_replace_and_delete_attribute() {
    let schema = post_schema();
    let post = Document::new(&schema);

    post.set("title", "first");
    post.set("title", "second");
    assert_raw(&post, json!({"t": "second"}));

    post.delete("title").expect("Failed to delete title");
    assert!(post.is_empty());
    assert!(post.get("title").unwrap().is_unset());

    // Deleting again is harmless
    post.delete("title").expect("Deleting an unset attribute should succeed");
}

#[test]
fn test_mapped_leaf_can_hold_any_value() {
    let schema = Schema::builder("Loose")
        .database("db")
        .collection("loose")
        .field("val", "v")
        .build()
        .expect("Failed to build schema");
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let loose = Collection::new(&schema).expect("Failed to open collection");

    let item = Document::new(&schema);
    assert!(item.get("val").unwrap().is_unset());
    item.set("val", doc(json!({"hello": "world"})));
    let id = loose.insert(&item).expect("Failed to insert");

    let found = loose
        .find_one(&Doc::new().with("_id", id))
        .expect("Failed to query")
        .expect("Document should exist");
    // A map under a leaf name is a snapshot, not a cursor
    let val = found.get("val").unwrap();
    assert_eq!(val, Value::from(doc(json!({"hello": "world"}))));
    assert!(val.into_dict().unwrap_err().is_type_error());
}

// ===== UNMAPPED ATTRIBUTES =====

#[test]
fn test_unmapped_attributes_stay_off_the_document() {
    let schema = post_schema();
    let post = Document::new(&schema);

    post.set("scratch", 42);
    assert_eq!(post.get("scratch").unwrap(), 42);
    assert!(post.is_empty());
    assert_logical(&post, json!({"views": 0, "slug": "draft"}));

    post.delete("scratch").expect("Failed to delete scratch value");
    let err = post.get("scratch").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        Error::Document(DocumentError::AttributeNotFound { .. })
    ));
}

#[test]
fn test_type_attributes_are_shared_and_never_stored() {
    let schema = Schema::builder("Typed")
        .field("name", "n")
        .attribute("kind", "typed")
        .build()
        .expect("Failed to build schema");
    let first = Document::new(&schema);
    let second = Document::new(&schema);

    assert_eq!(first.get("kind").unwrap(), "typed");
    assert_eq!(second.get("kind").unwrap(), "typed");

    // A per-document value shadows the type attribute
    first.set("kind", "custom");
    assert_eq!(first.get("kind").unwrap(), "custom");
    assert_eq!(second.get("kind").unwrap(), "typed");
    assert!(first.is_empty());
}

#[test]
fn test_unknown_attribute_is_an_error() {
    let schema = post_schema();
    let post = Document::new(&schema);

    assert!(post.get("nope").unwrap_err().is_not_found());
    assert!(post.delete("nope").unwrap_err().is_not_found());
    assert!(post.dict("nope").unwrap_err().is_not_found());
}

// ===== RAW ACCESS =====

#[test]
fn test_unmapped_raw_keys_survive_mapping() {
    let schema = post_schema();
    let post = Document::from_raw(&schema, doc(json!({"t": "x", "legacy": 1})));

    assert_eq!(post.len(), 2);
    assert_logical(
        &post,
        json!({"title": "x", "legacy": 1, "views": 0, "slug": "draft"}),
    );
    assert_eq!(post.remove_key("legacy"), Some(Value::Int(1)));
    assert!(!post.contains_key("legacy"));
}

#[test]
fn test_documents_compare_by_raw_content() {
    let schema = post_schema();
    let a = Document::new(&schema);
    let b = Document::new(&schema);
    a.set("title", "same");
    b.set("title", "same");

    assert_eq!(a, b);
    assert_eq!(a, doc(json!({"t": "same"})));
    b.set("scratch", true);
    assert_eq!(a, b);
    b.set("views", 3);
    assert_ne!(a, b);
}
