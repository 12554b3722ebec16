//! Driver layer
//!
//! Drivers turn a backend's connection descriptor into a live
//! [`Connection`]. The [`DriverRegistry`] is the capability registry backends
//! consult during `initialize`: a backend whose driver is not registered
//! cannot be opened.

use crate::target::Credentials;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub mod server;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub use server::MySqlDriver;
#[cfg(feature = "postgres")]
pub use server::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

/// Registry name of the SQLite driver
pub const SQLITE_DRIVER: &str = "sqlite";
/// Registry name of the PostgreSQL driver
pub const POSTGRES_DRIVER: &str = "postgresql";
/// Registry name of the MySQL driver
pub const MYSQL_DRIVER: &str = "mysql";
/// Registry name of the H2 driver; no builtin driver provides it
pub const H2_DRIVER: &str = "h2";

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("no driver registered under '{0}'")]
    NotRegistered(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(any(feature = "postgres", feature = "mysql"))]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Connection factory for one engine
pub trait Driver: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Open a connection; `descriptor` must follow the engine's URI grammar
    fn connect(
        &self,
        descriptor: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, DriverError>;
}

/// A live connection handle
///
/// All calls block until the engine answers.
pub trait Connection: Send {
    /// Run a statement and return the number of affected rows
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Run a statement and collect its rows
    fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError>;

    /// Round-trip check
    fn is_valid(&mut self) -> bool;

    /// Release the handle
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names; empty when the driver reports none for an empty result
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Named drivers available to backends
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every driver compiled into this build
    #[allow(unused_mut)]
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(SqliteDriver);

        #[cfg(feature = "postgres")]
        registry.register(PostgresDriver);

        #[cfg(feature = "mysql")]
        registry.register(MySqlDriver);

        registry
    }

    /// Shared builtin registry, used by backends constructed without one
    pub fn builtin() -> Arc<Self> {
        static BUILTIN: OnceLock<Arc<DriverRegistry>> = OnceLock::new();
        Arc::clone(BUILTIN.get_or_init(|| Arc::new(Self::with_builtin_drivers())))
    }

    /// Register a driver under its own name, replacing any previous one
    pub fn register<D: Driver + 'static>(&mut self, driver: D) -> &mut Self {
        self.register_shared(Arc::new(driver))
    }

    pub fn register_shared(&mut self, driver: Arc<dyn Driver>) -> &mut Self {
        debug!("Registering driver: {}", driver.name());
        self.drivers.insert(driver.name().to_string(), driver);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Registered driver names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
