use serde_json::json;

use shortkey::{
    Attr, Collection, Document, Value,
    document::Element,
    schema::{Embed, Schema},
    value::Doc,
};

use crate::helpers::*;

/// `s1 -> s1`, `l1 -> l1 [ { s2 -> s2, l2 -> l2 [ { s3 -> s3 } ] } ]`
fn nested_list_schema() -> std::sync::Arc<Schema> {
    Schema::builder("Nested")
        .database("db")
        .collection("nested")
        .field("s1", "s1")
        .embed(
            "l1",
            Embed::new("l1")
                .field("s2", "s2")
                .embed("l2", Embed::new("l2").field("s3", "s3")),
        )
        .build()
        .expect("Failed to build nested list schema")
}

// ===== BUILDING LISTS =====

#[test]
fn test_new_items_take_attribute_names() {
    let schema = post_schema();
    let post = Document::new(&schema);

    let comments = post.list("comments").unwrap();
    let first = comments.new_item().unwrap();
    first.set("author", "ann").unwrap();
    first.set("body", "first!").unwrap();
    comments.new_item().unwrap().set("author", "bob").unwrap();

    assert_raw(&post, json!({"c": [{"a": "ann", "b": "first!"}, {"a": "bob"}]}));
    assert_eq!(
        post.for_json().unwrap().get("comments"),
        Some(&Value::from(json!([
            {"author": "ann", "body": "first!"},
            {"author": "bob"}
        ])))
    );
}

#[test]
fn test_nested_lists_round_trip_through_storage() {
    let schema = nested_list_schema();
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let nested = Collection::new(&schema).expect("Failed to open collection");

    let item_doc = Document::new(&schema);
    item_doc.set("s1", 1);
    let item = item_doc.list("l1").unwrap().new_item().unwrap();
    item.set("s2", 2).unwrap();
    item.list("l2").unwrap().new_item().unwrap().set("s3", 3).unwrap();

    let expected = json!({"s1": 1, "l1": [{"s2": 2, "l2": [{"s3": 3}]}]});
    assert_raw(&item_doc, expected.clone());

    let id = nested.insert(&item_doc).expect("Failed to insert");
    let found = nested
        .find_one(&Doc::new().with("_id", id))
        .expect("Failed to query")
        .expect("Document should exist");
    found.remove_key("_id");
    assert_raw(&found, expected);

    let inner = found
        .list("l1")
        .unwrap()
        .get(0)
        .unwrap()
        .into_dict()
        .unwrap()
        .list("l2")
        .unwrap();
    assert_eq!(inner.get(0).unwrap().into_dict().unwrap().get("s3").unwrap(), 3);
}

#[test]
fn test_mixed_lists_map_only_documents() {
    let schema = post_schema();
    let post = Document::new(&schema);
    post.set("comments", Value::from(json!([{"a": "hello"}, "world"])));

    let comments = post.get("comments").unwrap().into_list().unwrap();
    assert_eq!(comments.len(), 2);
    assert!(matches!(comments.get(0).unwrap(), Element::Dict(_)));
    assert_eq!(comments.get(1).unwrap(), "world");
    assert_eq!(
        comments.for_json(),
        vec![Value::from(json!({"author": "hello"})), Value::from("world")]
    );
    assert!(comments.get(2).unwrap_err().is_index_error());
}

// ===== ITERATION AND UPDATES =====

#[test]
fn test_iterate_elements() {
    let schema = post_schema();
    let post = Document::new(&schema);
    let comments = post.list("comments").unwrap();
    for i in 0..5 {
        comments.new_item().unwrap().set("author", i).unwrap();
    }

    let authors: Vec<i64> = comments
        .iter()
        .map(|element| {
            element
                .into_dict()
                .unwrap()
                .get("author")
                .unwrap()
                .to_value()
                .and_then(|value| value.as_int())
                .unwrap()
        })
        .collect();
    assert_eq!(authors, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_modified_items_save() {
    let schema = post_schema();
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let posts = Collection::new(&schema).expect("Failed to open collection");

    let post = Document::new(&schema);
    let comments = post.list("comments").unwrap();
    for i in 0..5 {
        comments.new_item().unwrap().set("author", i).unwrap();
    }
    let id = posts.insert(&post).expect("Failed to insert");

    let found = posts
        .find_one(&Doc::new().with("_id", id.clone()))
        .unwrap()
        .unwrap();
    // Lists of embedded documents come back as list cursors
    assert!(matches!(found.get("comments").unwrap(), Attr::List(_)));
    for element in found.list("comments").unwrap().iter() {
        element.into_dict().unwrap().set("author", 12).unwrap();
    }
    posts.save(&found).expect("Failed to save");

    let reloaded = posts
        .find_one(&Doc::new().with("_id", id))
        .unwrap()
        .unwrap();
    let comments = reloaded.list("comments").unwrap();
    assert_eq!(comments.len(), 5);
    let total: i64 = comments
        .to_vec()
        .iter()
        .filter_map(|value| value.as_doc()?.get("a")?.as_int())
        .sum();
    assert_eq!(total, 60);
}

#[test]
fn test_deleting_inside_an_element_keeps_the_element() {
    let schema = post_schema();
    let post = Document::new(&schema);
    let comment = post.list("comments").unwrap().new_item().unwrap();
    comment.set("author", "ann").unwrap();

    comment.delete("author").unwrap();

    assert_raw(&post, json!({"c": [{}]}));
}

#[test]
fn test_list_set_push_and_remove() {
    let schema = post_schema();
    let post = Document::new(&schema);
    let comments = post.list("comments").unwrap();

    comments.push(doc(json!({"a": "ann"}))).unwrap();
    comments.push(doc(json!({"a": "bob"}))).unwrap();
    comments.set(0, doc(json!({"a": "cat"}))).unwrap();
    assert_eq!(comments.remove(1).unwrap(), Value::from(json!({"a": "bob"})));

    assert_raw(&post, json!({"c": [{"a": "cat"}]}));
    assert!(comments.set(3, "x").unwrap_err().is_index_error());
    assert!(comments.remove(3).unwrap_err().is_index_error());
}
