//! Backend construction from configuration
//!
//! [`AnyDatabase`] lets a host hold any backend behind one type. Its methods
//! mirror [`Backend`], with statement classification erased to a
//! [`Statement`].

use crate::backend::{Backend, QueryResult};
use crate::config::{BackendConfig, DatabaseConfig};
use crate::driver::DriverRegistry;
use crate::error::Result;
use crate::h2::H2;
use crate::instance::ErrorRecord;
use crate::mysql::MySql;
use crate::postgresql::PostgreSql;
use crate::sqlite::Sqlite;
use crate::statement::Statement;
use crate::{DriverKind, LifecycleState};
use std::sync::Arc;
use tracing::info;

/// One database instance of any backend
pub enum AnyDatabase {
    H2(H2),
    Sqlite(Sqlite),
    PostgreSql(PostgreSql),
    MySql(MySql),
}

macro_rules! dispatch {
    ($self:expr, $db:ident => $body:expr) => {
        match $self {
            AnyDatabase::H2($db) => $body,
            AnyDatabase::Sqlite($db) => $body,
            AnyDatabase::PostgreSql($db) => $body,
            AnyDatabase::MySql($db) => $body,
        }
    };
}

impl AnyDatabase {
    pub fn initialize(&mut self) -> bool {
        dispatch!(self, db => db.initialize())
    }

    pub fn open(&mut self) -> bool {
        dispatch!(self, db => db.open())
    }

    pub fn close(&mut self) -> bool {
        dispatch!(self, db => db.close())
    }

    pub fn is_open(&mut self) -> bool {
        dispatch!(self, db => db.is_open())
    }

    pub fn driver(&self) -> DriverKind {
        dispatch!(self, db => db.driver())
    }

    pub fn state(&self) -> LifecycleState {
        dispatch!(self, db => db.state())
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        dispatch!(self, db => db.last_error())
    }

    /// Classify `query` in the backend's dialect
    pub fn statement(&mut self, query: &str) -> Result<Statement> {
        dispatch!(self, db => {
            let driver = db.driver();
            db.statement(query).map(|kind| Statement::of(driver, kind))
        })
    }

    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        dispatch!(self, db => db.query(sql))
    }

    pub fn is_table(&mut self, table: &str) -> Result<bool> {
        dispatch!(self, db => db.is_table(table))
    }

    pub fn truncate(&mut self, table: &str) -> Result<bool> {
        dispatch!(self, db => db.truncate(table))
    }
}

impl From<H2> for AnyDatabase {
    fn from(db: H2) -> Self {
        AnyDatabase::H2(db)
    }
}

impl From<Sqlite> for AnyDatabase {
    fn from(db: Sqlite) -> Self {
        AnyDatabase::Sqlite(db)
    }
}

impl From<PostgreSql> for AnyDatabase {
    fn from(db: PostgreSql) -> Self {
        AnyDatabase::PostgreSql(db)
    }
}

impl From<MySql> for AnyDatabase {
    fn from(db: MySql) -> Self {
        AnyDatabase::MySql(db)
    }
}

/// Builds database instances from a [`DatabaseConfig`]
pub struct DatabaseFactory;

impl DatabaseFactory {
    /// Instance consulting the builtin driver registry
    pub fn build(config: &DatabaseConfig) -> Result<AnyDatabase> {
        Self::build_with_drivers(config, DriverRegistry::builtin())
    }

    /// Instance consulting `drivers`
    pub fn build_with_drivers(
        config: &DatabaseConfig,
        drivers: Arc<DriverRegistry>,
    ) -> Result<AnyDatabase> {
        let prefix = config.prefix.as_str();
        let database: AnyDatabase = match &config.backend {
            BackendConfig::H2 {
                directory,
                filename,
                extension,
            } => {
                let db = match extension {
                    Some(ext) => H2::with_extension(prefix, directory, filename, ext)?,
                    None => H2::new(prefix, directory, filename)?,
                };
                db.with_drivers(drivers).into()
            }
            BackendConfig::Sqlite {
                directory,
                filename,
                extension,
            } => {
                let db = match extension {
                    Some(ext) => Sqlite::with_extension(prefix, directory, filename, ext)?,
                    None => Sqlite::new(prefix, directory, filename)?,
                };
                db.with_drivers(drivers).into()
            }
            BackendConfig::PostgreSql {
                host,
                port,
                database,
                credentials,
            } => PostgreSql::new(
                prefix,
                host,
                *port,
                database,
                &credentials.username,
                &credentials.password,
            )?
            .with_drivers(drivers)
            .into(),
            BackendConfig::MySql {
                host,
                port,
                database,
                credentials,
            } => MySql::new(
                prefix,
                host,
                *port,
                database,
                &credentials.username,
                &credentials.password,
            )?
            .with_drivers(drivers)
            .into(),
        };

        info!("Built {} database instance", database.driver());
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Credentials;
    use crate::DatabaseError;
    use std::path::PathBuf;

    #[test]
    fn test_build_each_backend() {
        let registry = Arc::new(DriverRegistry::new());
        let backends = [
            BackendConfig::H2 {
                directory: PathBuf::from("/tmp"),
                filename: "mydb".to_string(),
                extension: None,
            },
            BackendConfig::default(),
            BackendConfig::PostgreSql {
                host: "localhost".to_string(),
                port: 5432,
                database: "inventory".to_string(),
                credentials: Credentials::new("app", "secret"),
            },
            BackendConfig::MySql {
                host: "localhost".to_string(),
                port: 3306,
                database: "inventory".to_string(),
                credentials: Credentials::default(),
            },
        ];

        for backend in backends {
            let expected = backend.driver();
            let config = DatabaseConfig {
                prefix: "[Test] ".to_string(),
                backend,
            };
            let db = DatabaseFactory::build_with_drivers(&config, registry.clone()).unwrap();
            assert_eq!(db.driver(), expected);
            assert_eq!(db.state(), LifecycleState::Uninitialized);
        }
    }

    #[test]
    fn test_build_rejects_invalid_target() {
        let config = DatabaseConfig {
            prefix: String::new(),
            backend: BackendConfig::PostgreSql {
                host: String::new(),
                port: 5432,
                database: "inventory".to_string(),
                credentials: Credentials::default(),
            },
        };
        assert!(matches!(
            DatabaseFactory::build(&config),
            Err(DatabaseError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_erased_statement() {
        let config = DatabaseConfig {
            prefix: String::new(),
            backend: BackendConfig::MySql {
                host: "localhost".to_string(),
                port: 3306,
                database: "inventory".to_string(),
                credentials: Credentials::default(),
            },
        };
        let mut db = DatabaseFactory::build(&config).unwrap();

        let statement = db.statement("  describe items").unwrap();
        assert_eq!(statement.driver, DriverKind::MySQL);
        assert_eq!(statement.keyword, "DESCRIBE");
        assert!(statement.returns_rows);

        assert!(matches!(
            db.statement("VACUUM"),
            Err(DatabaseError::UnknownStatement(_))
        ));
        assert!(db.last_error().is_some());
    }

    #[test]
    fn test_open_without_driver_reports_false() {
        let config = DatabaseConfig {
            prefix: String::new(),
            backend: BackendConfig::H2 {
                directory: PathBuf::from("/tmp"),
                filename: "mydb".to_string(),
                extension: None,
            },
        };
        let mut db = DatabaseFactory::build(&config).unwrap();
        assert!(!db.open());
        assert!(!db.is_open());
        assert!(db.close());
        assert!(matches!(db.is_table("t"), Err(DatabaseError::Unsupported { .. })));
    }
}
