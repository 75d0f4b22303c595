//! Auto-increment saved default integration tests

use serde_json::json;

use shortkey::{
    Collection, ConnectionConfig, Document, Error, Value,
    backend::Backend,
    connection::ConnectionError,
    helpers::auto_increment,
    schema::Schema,
    value::Doc,
};

use crate::helpers::*;

fn ticket_schema() -> std::sync::Arc<Schema> {
    Schema::builder("Ticket")
        .database("desk")
        .collection("tickets")
        .field("subject", "s")
        .field_with_generator(
            "number",
            "n",
            auto_increment("desk", "counters", "Ticket_number"),
        )
        .build()
        .expect("Failed to build ticket schema")
}

#[test]
fn test_inserted_documents_are_numbered() {
    let schema = ticket_schema();
    let (connection, backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");
    let tickets = Collection::new(&schema).expect("Failed to open collection");

    for subject in ["printer", "network", "coffee"] {
        let ticket = Document::new(&schema);
        ticket.set("subject", subject);
        tickets.insert(&ticket).expect("Failed to insert ticket");
    }

    let numbers: Vec<_> = tickets
        .find(&Doc::new())
        .unwrap()
        .iter()
        .map(|ticket| ticket.get("number").unwrap().to_value().unwrap())
        .collect();
    assert_eq!(numbers, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let counter = auto_increment("desk", "counters", "Ticket_number");
    let stored = backend
        .find_one(counter.namespace(), &Doc::new())
        .unwrap()
        .expect("Counter document should exist");
    assert_eq!(stored, json!({"_id": "Ticket_number", "value": 3}));
}

#[test]
fn test_number_is_drawn_once_per_document() {
    let schema = ticket_schema();
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");

    let ticket = Document::new(&schema);
    assert_eq!(ticket.get("number").unwrap(), 1);
    assert_eq!(ticket.get("number").unwrap(), 1);
    assert_eq!(Document::new(&schema).get("number").unwrap(), 2);
}

#[test]
fn test_float_counters_stay_floats() {
    let (connection, backend) = setup_connection();
    let counter = auto_increment("desk", "counters", "ratio");
    backend
        .insert(counter.namespace(), doc(json!({"_id": "ratio", "value": 1.5})))
        .unwrap();
    let _guard = connection.start().expect("Failed to start connection");

    assert_eq!(counter.next_value().unwrap(), Value::Float(2.5));
}

#[test]
fn test_user_defined_step() {
    let (connection, _backend) = setup_connection();
    let counter = auto_increment("desk", "counters", "stepped").increment(5);
    let _guard = connection.start().expect("Failed to start connection");

    assert_eq!(counter.next_value().unwrap(), 5);
    assert_eq!(counter.next_value().unwrap(), 10);
}

#[test]
fn test_counter_requires_a_connection() {
    let schema = ticket_schema();
    let ticket = Document::new(&schema);

    let err = ticket.get("number").unwrap_err();
    assert!(err.is_no_connection());
    assert!(ticket.is_empty());
}

#[test]
fn test_counter_in_the_wrong_database() {
    let schema = ticket_schema();
    let (connection, _backend) = setup_connection_with(ConnectionConfig::default().with_database("other"));
    let _guard = connection.start().expect("Failed to start connection");

    let err = Document::new(&schema).get("number").unwrap_err();
    assert!(matches!(
        err,
        Error::Connection(ConnectionError::DatabaseMismatch { .. })
    ));
}

#[test]
fn test_subtypes_share_the_counter() {
    let base = ticket_schema();
    let urgent = Schema::builder("UrgentTicket")
        .extends(&base)
        .field("pager", "p")
        .build()
        .expect("Failed to build subtype");
    let (connection, _backend) = setup_connection();
    let _guard = connection.start().expect("Failed to start connection");

    assert_eq!(Document::new(&base).get("number").unwrap(), 1);
    assert_eq!(Document::new(&urgent).get("number").unwrap(), 2);
}
