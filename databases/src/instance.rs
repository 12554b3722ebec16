//! Shared lifecycle bookkeeping
//!
//! Every backend composes a [`DatabaseCore`]: it owns the connection slot,
//! the lifecycle state, the most recent [`ErrorRecord`] and the prefixed log
//! sink. Backend-specific behavior stays in the backend; the core only
//! records outcomes.

use crate::driver::{Connection, DriverError, DriverRegistry, ResultSet};
use crate::error::{DatabaseError, Result};
use crate::target::Credentials;
use crate::{DriverKind, LifecycleState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The most recent failure of a database instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Human-readable message
    pub message: String,
    /// Whether the message was also written to the log at error level
    pub logged: bool,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Prefixed log sink
///
/// Lines read `{prefix}{backend prefix}{message}`, for example
/// `[Inventory] [SQLite] Connection opened`.
#[derive(Debug, Clone)]
pub struct DatabaseLog {
    prefix: String,
    driver: DriverKind,
}

impl DatabaseLog {
    pub fn new(prefix: impl Into<String>, driver: DriverKind) -> Self {
        Self {
            prefix: prefix.into(),
            driver,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full log line for `message`
    pub fn line(&self, message: &str) -> String {
        format!("{}{}{}", self.prefix, self.driver.log_prefix(), message)
    }

    pub fn debug(&self, message: &str) {
        debug!(prefix = %self.prefix, driver = %self.driver, "{}", self.line(message));
    }

    pub fn info(&self, message: &str) {
        info!(prefix = %self.prefix, driver = %self.driver, "{}", self.line(message));
    }

    pub fn warn(&self, message: &str) {
        warn!(prefix = %self.prefix, driver = %self.driver, "{}", self.line(message));
    }

    pub fn error(&self, message: &str) {
        error!(prefix = %self.prefix, driver = %self.driver, "{}", self.line(message));
    }
}

/// State shared by all backends
pub struct DatabaseCore {
    driver: DriverKind,
    log: DatabaseLog,
    drivers: Arc<DriverRegistry>,
    state: LifecycleState,
    connection: Option<Box<dyn Connection>>,
    last_error: Option<ErrorRecord>,
}

impl DatabaseCore {
    /// Core using the builtin driver registry
    pub fn new(driver: DriverKind, prefix: impl Into<String>) -> Self {
        Self {
            driver,
            log: DatabaseLog::new(prefix, driver),
            drivers: DriverRegistry::builtin(),
            state: LifecycleState::Uninitialized,
            connection: None,
            last_error: None,
        }
    }

    /// Replace the driver registry consulted by `initialize`
    pub fn set_drivers(&mut self, drivers: Arc<DriverRegistry>) {
        self.drivers = drivers;
    }

    pub fn driver(&self) -> DriverKind {
        self.driver
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn log(&self) -> &DatabaseLog {
        &self.log
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last_error.as_ref()
    }

    /// True while a connection handle is held
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Record a failure, replacing the previous one.
    ///
    /// With `log` set the message is written at error level; otherwise it is
    /// only kept in the record (and traced at debug level).
    pub fn write_error(&mut self, message: impl Into<String>, log: bool) {
        let message = message.into();
        if log {
            self.log.error(&message);
        } else {
            self.log.debug(&message);
        }
        self.last_error = Some(ErrorRecord {
            message,
            logged: log,
            recorded_at: Utc::now(),
        });
    }

    /// Record `error` and hand it back for returning
    pub fn fail(&mut self, error: DatabaseError) -> DatabaseError {
        self.write_error(error.to_string(), true);
        error
    }

    /// Record and return an `Unsupported` failure for `operation`
    pub fn unsupported(&mut self, operation: &'static str) -> DatabaseError {
        let driver = self.driver;
        self.fail(DatabaseError::Unsupported { driver, operation })
    }

    /// Check that driver `name` is registered
    ///
    /// Moves UNINITIALIZED/CLOSED instances to INITIALIZED on success. A
    /// failure is recorded and leaves the state untouched.
    pub fn load_driver(&mut self, name: &str) -> bool {
        if !self.drivers.is_available(name) {
            let driver = self.driver;
            self.fail(DatabaseError::DriverUnavailable {
                driver,
                message: DriverError::NotRegistered(name.to_string()).to_string(),
            });
            return false;
        }

        if self.state != LifecycleState::Open {
            self.state = LifecycleState::Initialized;
        }
        self.log.debug(&format!("Driver '{name}' available"));
        true
    }

    /// Request a connection from driver `name`
    pub fn connect(
        &mut self,
        name: &str,
        descriptor: &str,
        credentials: Option<&Credentials>,
    ) -> bool {
        let driver = self.driver;
        let Some(factory) = self.drivers.get(name) else {
            self.fail(DatabaseError::DriverUnavailable {
                driver,
                message: DriverError::NotRegistered(name.to_string()).to_string(),
            });
            return false;
        };

        match factory.connect(descriptor, credentials) {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = LifecycleState::Open;
                self.log.info("Connection opened");
                true
            }
            Err(e) => {
                self.fail(DatabaseError::ConnectionFailure {
                    driver,
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Release the handle if one is held; a no-op otherwise
    pub fn close(&mut self) -> bool {
        let Some(connection) = self.connection.take() else {
            return true;
        };

        self.state = LifecycleState::Closed;
        match connection.close() {
            Ok(()) => {
                self.log.info("Connection closed");
                true
            }
            Err(e) => {
                self.write_error(format!("Failed to close connection cleanly: {e}"), true);
                false
            }
        }
    }

    /// Ping the open handle
    pub fn is_valid(&mut self) -> bool {
        match self.connection.as_deref_mut() {
            Some(connection) => connection.is_valid(),
            None => false,
        }
    }

    /// The open handle, or a recorded `NotOpen` failure
    pub fn connection(&mut self) -> Result<&mut dyn Connection> {
        let driver = self.driver;
        if self.connection.is_none() {
            return Err(self.fail(DatabaseError::NotOpen { driver }));
        }
        match self.connection.as_deref_mut() {
            Some(connection) => Ok(connection),
            None => Err(DatabaseError::NotOpen { driver }),
        }
    }

    /// Run a row-producing statement on the open handle
    pub fn run_query(&mut self, sql: &str) -> Result<ResultSet> {
        let driver = self.driver;
        let result = self.connection()?.query(sql);
        result.map_err(|source| self.fail(DatabaseError::Driver { driver, source }))
    }

    /// Run a statement on the open handle and return the affected row count
    pub fn run_update(&mut self, sql: &str) -> Result<u64> {
        let driver = self.driver;
        let result = self.connection()?.execute(sql);
        result.map_err(|source| self.fail(DatabaseError::Driver { driver, source }))
    }
}

impl Drop for DatabaseCore {
    fn drop(&mut self) {
        if self.connection.is_some() {
            self.log.warn("Dropping open connection without close()");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let log = DatabaseLog::new("[Inventory] ", DriverKind::H2);
        assert_eq!(log.line("Connection opened"), "[Inventory] [H2] Connection opened");
    }

    #[test]
    fn test_write_error_overwrites_previous() {
        let mut core = DatabaseCore::new(DriverKind::SQLite, "");
        assert!(core.last_error().is_none());

        core.write_error("first", true);
        core.write_error("second", false);

        let record = core.last_error().unwrap();
        assert_eq!(record.message, "second");
        assert!(!record.logged);
    }

    #[test]
    fn test_close_without_connection_is_noop() {
        let mut core = DatabaseCore::new(DriverKind::SQLite, "");
        assert!(core.close());
        assert!(core.close());
        assert!(core.last_error().is_none());
        assert_eq!(core.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_missing_driver_keeps_state() {
        let mut core = DatabaseCore::new(DriverKind::H2, "");
        core.set_drivers(Arc::new(DriverRegistry::new()));

        assert!(!core.load_driver("h2"));
        assert_eq!(core.state(), LifecycleState::Uninitialized);
        assert!(core
            .last_error()
            .unwrap()
            .message
            .contains("no driver registered under 'h2'"));
    }

    #[test]
    fn test_connect_without_registered_driver() {
        let mut core = DatabaseCore::new(DriverKind::MySQL, "");
        core.set_drivers(Arc::new(DriverRegistry::new()));

        assert!(!core.connect("mysql", "mysql://localhost:3306/x", None));
        assert!(!core.has_connection());
        let missing = DriverError::NotRegistered("mysql".to_string());
        assert_eq!(
            core.last_error().unwrap().message,
            format!("MySQL driver missing: {missing}")
        );
    }

    #[test]
    fn test_connection_requires_open() {
        let mut core = DatabaseCore::new(DriverKind::MySQL, "");
        let err = core.run_query("SELECT 1").err().unwrap();
        assert!(matches!(err, DatabaseError::NotOpen { .. }));
        assert_eq!(
            core.last_error().unwrap().message,
            "MySQL connection is not open"
        );
    }

    #[test]
    fn test_unsupported_is_recorded() {
        let mut core = DatabaseCore::new(DriverKind::H2, "");
        let err = core.unsupported("truncate");
        assert!(matches!(err, DatabaseError::Unsupported { operation: "truncate", .. }));
        assert_eq!(
            core.last_error().unwrap().message,
            "truncate is not supported by H2"
        );
    }
}
