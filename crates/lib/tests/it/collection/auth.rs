use shortkey::{
    Collection, ConnectionConfig, Schema,
    connection::{Connection, Credentials},
};

use crate::helpers::*;

fn guarded_schema(auth: Option<&str>) -> std::sync::Arc<Schema> {
    let mut builder = Schema::builder("Secret")
        .database("vault")
        .collection("secrets")
        .field("value", "v");
    if let Some(auth) = auth {
        builder = builder.auth(auth);
    }
    builder.build().expect("Failed to build schema")
}

fn setup_guarded(auth: Option<&str>) -> Connection {
    let mut config = ConnectionConfig::default();
    if let Some(auth) = auth {
        config = config.with_auth(auth);
    }
    let (connection, backend) = setup_connection_with(config);
    backend
        .add_user("vault", Credentials::new("admin", "secret"))
        .expect("Failed to add user");
    connection
}

#[test]
fn test_valid_connection_credentials() {
    let connection = setup_guarded(Some("admin:secret"));
    let schema = guarded_schema(None);

    connection
        .scope(|| Collection::new(&schema).map(|_| ()))
        .expect("Valid credentials should authenticate");
}

#[test]
fn test_invalid_connection_credentials() {
    let connection = setup_guarded(Some("admin:wrong"));
    let schema = guarded_schema(None);

    let err = connection
        .scope(|| Collection::new(&schema).map(|_| ()))
        .unwrap_err();
    assert!(err.is_authentication_error());
}

#[test]
fn test_document_credentials_override_connection_credentials() {
    let connection = setup_guarded(Some("guest:nope"));

    connection
        .scope(|| Collection::new(&guarded_schema(Some("admin:secret"))).map(|_| ()))
        .expect("Document credentials should be used");

    let connection = setup_guarded(Some("admin:secret"));
    let err = connection
        .scope(|| Collection::new(&guarded_schema(Some("admin:wrong"))).map(|_| ()))
        .unwrap_err();
    assert!(err.is_authentication_error());
}

#[test]
fn test_connection_without_credentials_skips_authentication() {
    let connection = setup_guarded(None);

    connection
        .scope(|| Collection::new(&guarded_schema(Some("admin:wrong"))).map(|_| ()))
        .expect("Connections without credentials do not authenticate");
}

#[test]
fn test_malformed_auth_strings() {
    for auth in ["nocolon", "a:b:c", "user@host:pw", ":pw"] {
        let err = Schema::builder("Bad").auth(auth).build().unwrap_err();
        assert!(err.is_authentication_error(), "{auth} should be rejected");

        let backend = std::sync::Arc::new(shortkey::backend::InMemory::new());
        let err = Connection::new(ConnectionConfig::default().with_auth(auth), backend).unwrap_err();
        assert!(err.is_config_error(), "{auth} should be rejected");
    }
}
