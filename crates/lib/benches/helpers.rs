//! Shared helpers for benchmarks

use std::sync::Arc;

use shortkey::{
    Connection, ConnectionConfig, Document,
    backend::InMemory,
    schema::{Embed, Index, SavedDefault, Schema},
};

/// The post type used across benchmarks.
pub fn post_schema() -> Arc<Schema> {
    Schema::builder("Post")
        .database("bench")
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

/// A post with `comment_count` embedded comments.
pub fn populated_post(schema: &Arc<Schema>, comment_count: usize) -> Document {
    let post = Document::new(schema);
    post.set("title", "benchmark");
    let meta = post.dict("meta").expect("meta is an embed");
    meta.set("tag", "rust").expect("Failed to set tag");
    meta.dict("source")
        .expect("source is an embed")
        .set("url", "https://example.com")
        .expect("Failed to set url");
    let comments = post.list("comments").expect("comments is an embed");
    for i in 0..comment_count {
        let comment = comments.new_item().expect("Failed to add comment");
        comment.set("author", format!("author_{i}")).expect("Failed to set author");
        comment.set("body", format!("body_{i}")).expect("Failed to set body");
    }
    post
}

pub fn setup_connection() -> Connection {
    Connection::new(ConnectionConfig::default(), Arc::new(InMemory::new()))
        .expect("Failed to create connection")
}
