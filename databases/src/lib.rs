//! SQLHub Databases Module
//!
//! One interface over several interchangeable SQL engines. Each engine is a
//! [`Backend`]: it owns a single connection handle, a closed statement
//! vocabulary used to classify raw queries, and the dialect-specific parts of
//! table introspection. File-based engines (H2, SQLite) are located by
//! directory and filename; server-based engines (PostgreSQL, MySQL) by host,
//! port, database name and credentials.
//!
//! ```no_run
//! use sqlhub_databases::{Backend, Sqlite};
//!
//! let mut db = Sqlite::new("[Inventory] ", "/tmp", "mydb")?;
//! if db.open() {
//!     let kind = db.statement("SELECT * FROM items")?;
//!     println!("classified as {kind}");
//!     db.close();
//! }
//! # Ok::<(), sqlhub_databases::DatabaseError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod factory;
pub mod h2;
pub mod instance;
pub mod mysql;
pub mod postgresql;
pub mod sqlite;
pub mod statement;
pub mod target;

pub use backend::{Backend, QueryResult};
pub use config::{BackendConfig, ConfigError, ConfigFormat, ConfigManager, DatabaseConfig};
pub use driver::{Connection, Driver, DriverError, DriverRegistry, ResultSet, Value};
pub use error::{DatabaseError, Result};
pub use factory::{AnyDatabase, DatabaseFactory};
pub use h2::{H2Statement, H2};
pub use instance::{DatabaseCore, DatabaseLog, ErrorRecord};
pub use mysql::{MySql, MySqlStatement};
pub use postgresql::{PostgreSql, PostgresStatement};
pub use sqlite::{Sqlite, SqliteStatement};
pub use statement::{classify, Statement, StatementKind};
pub use target::{Credentials, FileTarget, ServerTarget};

/// Engine an instance targets; fixed at construction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// H2 embedded database (file)
    H2,
    /// SQLite embedded database (file)
    SQLite,
    /// PostgreSQL server
    PostgreSQL,
    /// MySQL server
    MySQL,
}

impl DriverKind {
    /// Prefix inserted after the caller's prefix in log lines
    pub fn log_prefix(self) -> &'static str {
        match self {
            DriverKind::H2 => "[H2] ",
            DriverKind::SQLite => "[SQLite] ",
            DriverKind::PostgreSQL => "[PostgreSQL] ",
            DriverKind::MySQL => "[MySQL] ",
        }
    }

    /// Whether the engine stores its data in a local file
    pub fn is_file_based(self) -> bool {
        matches!(self, DriverKind::H2 | DriverKind::SQLite)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverKind::H2 => "H2",
            DriverKind::SQLite => "SQLite",
            DriverKind::PostgreSQL => "PostgreSQL",
            DriverKind::MySQL => "MySQL",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a database instance
///
/// A failed `initialize` or `open` does not add a state: the instance stays
/// where it was and may be opened again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never initialized
    Uninitialized,
    /// Driver available, no connection
    Initialized,
    /// Connection held
    Open,
    /// Connection released
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "UNINITIALIZED",
            LifecycleState::Initialized => "INITIALIZED",
            LifecycleState::Open => "OPEN",
            LifecycleState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
