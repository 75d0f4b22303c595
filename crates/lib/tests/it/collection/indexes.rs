use serde_json::json;

use shortkey::{
    Collection, Document,
    schema::{Index, Schema},
};

use crate::helpers::*;

#[test]
fn test_indexes_are_created_on_first_access() {
    let schema = post_schema();
    let (connection, backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");

    let posts = Collection::new(&schema).expect("Failed to open collection");

    let indexes = backend.indexes(posts.namespace()).unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].keys()[0].0, "m.t");
}

#[test]
fn test_index_hints_reach_the_backend() {
    let schema = Schema::builder("Hinted")
        .database("blog")
        .collection("hinted")
        .field("tag", "t")
        .index(Index::new("tag").background(false).cache_for(60))
        .build()
        .expect("Failed to build schema");
    let (connection, backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");

    let hinted = Collection::new(&schema).expect("Failed to open collection");

    let indexes = backend.indexes(hinted.namespace()).unwrap();
    assert_eq!(indexes.len(), 1);
    assert!(!indexes[0].is_background());
    assert_eq!(indexes[0].cache_secs(), 60);
    assert_eq!(indexes[0].keys()[0].0, "t");
}

#[test]
fn test_indexes_are_ensured_once_until_reset() {
    let schema = post_schema();
    let (first, first_backend) = setup_connection();
    let (second, second_backend) = setup_connection();
    let namespace = schema.namespace().unwrap();

    first
        .scope(|| Collection::new(&schema).map(|_| ()))
        .expect("Failed to open collection");
    assert_eq!(first_backend.indexes(&namespace).unwrap().len(), 1);

    // Already ensured for this schema: the second backend is not touched
    second
        .scope(|| Collection::new(&schema).map(|_| ()))
        .expect("Failed to open collection");
    assert!(second_backend.indexes(&namespace).unwrap().is_empty());

    schema.reset_indexes();
    second
        .scope(|| Collection::new(&schema).map(|_| ()))
        .expect("Failed to open collection");
    assert_eq!(second_backend.indexes(&namespace).unwrap().len(), 1);
}

#[test]
fn test_unique_index_rejects_duplicates() {
    let schema = Schema::builder("Account")
        .database("app")
        .collection("accounts")
        .field("email", "e")
        .index(Index::new("email").unique())
        .build()
        .expect("Failed to build schema");
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let accounts = Collection::new(&schema).expect("Failed to open collection");

    let first = Document::new(&schema);
    first.set("email", "a@example.com");
    accounts.insert(&first).expect("Failed to insert");

    let second = Document::new(&schema);
    second.set("email", "a@example.com");
    let err = accounts.insert(&second).unwrap_err();
    assert!(err.is_duplicate_key());
    assert!(err.is_database_error());
    assert!(!second.contains_key("_id"));
}

#[test]
fn test_unique_index_on_existing_duplicates_fails_access() {
    let plain = Schema::builder("Account")
        .database("app")
        .collection("accounts")
        .field("email", "e")
        .build()
        .expect("Failed to build schema");
    let unique = Schema::builder("UniqueAccount")
        .extends(&plain)
        .index(Index::new("email").unique())
        .build()
        .expect("Failed to build schema");
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");

    let accounts = Collection::new(&plain).expect("Failed to open collection");
    for _ in 0..2 {
        accounts
            .insert(&Document::from_raw(&plain, doc(json!({"e": "same"}))))
            .expect("Failed to insert");
    }

    let err = Collection::new(&unique).unwrap_err();
    assert!(err.is_duplicate_key());
}
