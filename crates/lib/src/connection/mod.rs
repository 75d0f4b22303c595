//! Scoped connection contexts.
//!
//! Storage operations only run inside an active connection context. A
//! [`Connection`] pairs a [`ConnectionConfig`] with a storage [`Backend`];
//! [`Connection::start`] pushes it onto a per-thread context stack and
//! returns a [`ConnectionGuard`] that pops it again when dropped.
//!
//! ```
//! use std::sync::Arc;
//! use shortkey::{backend::InMemory, connection::{Connection, ConnectionConfig}};
//!
//! let connection = Connection::new(ConnectionConfig::default(), Arc::new(InMemory::new()))?;
//! assert!(Connection::current().is_none());
//! {
//!     let _guard = connection.start()?;
//!     assert!(Connection::current().is_some());
//!     // Starting the same connection again on this thread is an error
//!     assert!(connection.start().is_err());
//! }
//! assert!(Connection::current().is_none());
//! # Ok::<(), shortkey::Error>(())
//! ```

use std::{cell::RefCell, fmt, marker::PhantomData, path::Path, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Result, backend::Backend};

pub mod errors;

pub use errors::ConnectionError;

thread_local! {
    static CONTEXTS: RefCell<Vec<Connection>> = const { RefCell::new(Vec::new()) };
}

/// Connection settings.
///
/// Every field has a default, so a config file only needs the settings it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host name or address of the storage server
    pub host: String,
    /// Port, if not the server default
    pub port: Option<u16>,
    /// Database this connection is bound to, if any
    pub database: Option<String>,
    /// Default credentials in `"user:password"` form
    pub auth: Option<String>,
    /// Replica set name
    pub replica_set: Option<String>,
    pub max_pool_size: u32,
    pub write_concern: u32,
    pub tz_aware: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: "localhost".to_string(),
            port: None,
            database: None,
            auth: None,
            replica_set: None,
            max_pool_size: 300,
            write_concern: 1,
            tz_aware: true,
        }
    }
}

impl ConnectionConfig {
    /// Loads settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// `host` or `host:port`.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }
}

/// A username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl FromStr for Credentials {
    type Err = ConnectionError;

    /// Parses `"user:password"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| ConnectionError::InvalidAuth {
            reason: reason.to_string(),
        };
        if s.contains('@') || s.matches(':').count() != 1 {
            return Err(invalid("expected 'user:password'"));
        }
        let (username, password) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected 'user:password'"))?;
        if username.is_empty() {
            return Err(invalid("username is empty"));
        }
        Ok(Credentials::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

struct Inner {
    config: ConnectionConfig,
    credentials: Option<Credentials>,
    backend: Arc<dyn Backend>,
}

/// A configured connection to a storage backend.
///
/// Cloning is cheap and clones refer to the same connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Creates a connection.
    ///
    /// # Errors
    /// A configuration error if the host is empty or the default credentials
    /// are malformed.
    pub fn new(config: ConnectionConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        if config.host.is_empty() {
            return Err(ConnectionError::InvalidConfig {
                reason: "missing required host".to_string(),
            }
            .into());
        }
        let credentials = config
            .auth
            .as_deref()
            .map(Credentials::from_str)
            .transpose()?;
        info!(address = %config.address(), replica_set = ?config.replica_set, "Creating new connection");
        Ok(Connection {
            inner: Arc::new(Inner {
                config,
                credentials,
                backend,
            }),
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// The database this connection is bound to, if any.
    pub fn database(&self) -> Option<&str> {
        self.inner.config.database.as_deref()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// Returns true if both handles refer to the same connection.
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Makes this connection the current context on this thread.
    ///
    /// # Errors
    /// [`ConnectionError::NestedConnection`] if this connection is already on
    /// the context stack.
    pub fn start(&self) -> Result<ConnectionGuard> {
        CONTEXTS.with_borrow_mut(|stack| -> Result<ConnectionGuard> {
            if stack.iter().any(|active| active.ptr_eq(self)) {
                return Err(ConnectionError::NestedConnection {
                    address: self.inner.config.address(),
                }
                .into());
            }
            stack.push(self.clone());
            debug!(address = %self.inner.config.address(), depth = stack.len(), "Started connection context");
            Ok(ConnectionGuard {
                connection: self.clone(),
                _not_send: PhantomData,
            })
        })
    }

    /// Runs `f` with this connection as the current context.
    pub fn scope<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.start()?;
        f()
    }

    /// The innermost active connection on this thread.
    pub fn current() -> Option<Connection> {
        CONTEXTS.with_borrow(|stack| stack.last().cloned())
    }

    /// The innermost active connection, or a [`ConnectionError::NoConnection`]
    /// naming `operation`.
    pub fn require(operation: &str) -> Result<Connection> {
        Self::current().ok_or_else(|| {
            ConnectionError::NoConnection {
                operation: operation.to_string(),
            }
            .into()
        })
    }

    /// Returns true if this connection is on this thread's context stack.
    pub fn is_active(&self) -> bool {
        CONTEXTS.with_borrow(|stack| stack.iter().any(|active| active.ptr_eq(self)))
    }

    /// Authenticates against `database`.
    ///
    /// A connection without default credentials does not authenticate at
    /// all. Otherwise `credentials` (typically from the document type) are
    /// used, falling back to the connection's own.
    pub fn authenticate(&self, database: &str, credentials: Option<&Credentials>) -> Result<()> {
        let Some(default) = &self.inner.credentials else {
            return Ok(());
        };
        let credentials = credentials.unwrap_or(default);
        self.inner
            .backend
            .authenticate(database, credentials)
            .map_err(|err| {
                debug!(database = %database, username = %credentials.username(), error = %err, "Authentication failed");
                ConnectionError::InvalidAuth {
                    reason: "invalid database credentials".to_string(),
                }
                .into()
            })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Keeps a connection current until dropped.
///
/// The guard is tied to the thread that started it.
#[must_use = "the connection context ends when the guard is dropped"]
pub struct ConnectionGuard {
    connection: Connection,
    _not_send: PhantomData<*const ()>,
}

impl ConnectionGuard {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        CONTEXTS.with_borrow_mut(|stack| {
            if let Some(position) = stack
                .iter()
                .rposition(|active| active.ptr_eq(&self.connection))
            {
                stack.remove(position);
            }
            debug!(address = %self.connection.inner.config.address(), depth = stack.len(), "Ended connection context");
        });
    }
}

impl fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("connection", &self.connection)
            .finish()
    }
}
