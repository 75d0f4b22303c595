use std::fs;

use serde_json::json;

use shortkey::{
    Collection, Connection, ConnectionConfig, Document,
    backend::{Backend, InMemory, Namespace},
    schema::Index,
    value::Doc,
};

use crate::helpers::*;

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("shortkey.json");
    let ns = Namespace::new("blog", "posts");

    {
        let backend = InMemory::new();
        backend
            .insert(&ns, doc(json!({"_id": "p1", "t": "hello", "c": [{"a": "ann"}]})))
            .unwrap();
        backend.create_index(&ns, &Index::new("t").unique()).unwrap();
        backend.save_to_file(&path).expect("Failed to save backend");
    }
    assert!(path.exists());

    let loaded = InMemory::load_from_file(&path).expect("Failed to load backend");
    assert_eq!(loaded.namespaces().unwrap(), vec![ns.clone()]);
    let stored = loaded.find_one(&ns, &Doc::new()).unwrap().unwrap();
    assert_eq!(stored, json!({"_id": "p1", "t": "hello", "c": [{"a": "ann"}]}));

    // Unique indexes are still enforced after loading
    let err = loaded.insert(&ns, doc(json!({"t": "hello"}))).unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn test_documents_survive_a_restart() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("blog.json");
    let schema = post_schema();

    let id = {
        let (connection, backend) = setup_connection();
        let _guard = connection.start().expect("Failed to start connection");
        let posts = Collection::new(&schema).expect("Failed to open collection");
        let post = Document::new(&schema);
        post.set("title", "persisted");
        post.dict("meta").unwrap().set("tag", "io").unwrap();
        let id = posts.insert(&post).expect("Failed to insert");
        backend.save_to_file(&path).expect("Failed to save backend");
        id
    };

    let backend = InMemory::load_from_file(&path).expect("Failed to load backend");
    let connection = Connection::new(ConnectionConfig::default(), std::sync::Arc::new(backend))
        .expect("Failed to create connection");
    let _guard = connection.start().expect("Failed to start connection");
    let posts = Collection::new(&schema).expect("Failed to open collection");

    let found = posts
        .find_one(&Doc::new().with("_id", id))
        .unwrap()
        .expect("Document should survive reload");
    assert_eq!(found.get("title").unwrap(), "persisted");
    assert_eq!(found.dict("meta").unwrap().get("tag").unwrap(), "io");
    assert_eq!(found.get("slug").unwrap(), "draft");
}

#[test]
fn test_load_missing_file_is_empty() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let backend = InMemory::load_from_file(dir.path().join("missing.json"))
        .expect("Missing file should load as empty");
    assert!(backend.namespaces().unwrap().is_empty());
}

#[test]
fn test_load_invalid_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("invalid.json");
    fs::write(&path, "{invalid json").unwrap();

    let err = InMemory::load_from_file(&path).unwrap_err();
    assert!(err.is_database_error());
    assert!(!err.is_duplicate_key());
}
