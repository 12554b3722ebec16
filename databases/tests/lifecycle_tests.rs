//! Lifecycle Tests
//!
//! Drives backends through a scripted driver registered by the host:
//! - open/close transitions and their recorded failures
//! - retry after a failed connection
//! - the classify -> validate -> execute query path

use sqlhub_databases::driver::H2_DRIVER;
use sqlhub_databases::{
    Backend, Connection, Credentials, DatabaseError, Driver, DriverError, DriverRegistry,
    H2Statement, LifecycleState, QueryResult, ResultSet, Value, H2,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Driver whose connections record every statement they run
#[derive(Default)]
struct ScriptedDriver {
    connects: AtomicUsize,
    refuse: AtomicBool,
    descriptors: Mutex<Vec<String>>,
    executed: Arc<Mutex<Vec<String>>>,
}

struct ScriptedConnection {
    executed: Arc<Mutex<Vec<String>>>,
}

impl Driver for ScriptedDriver {
    fn name(&self) -> &str {
        H2_DRIVER
    }

    fn connect(
        &self,
        descriptor: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, DriverError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.descriptors.lock().unwrap().push(descriptor.to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(DriverError::Other("database is locked".to_string()));
        }
        Ok(Box::new(ScriptedConnection {
            executed: Arc::clone(&self.executed),
        }))
    }
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(1)
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(ResultSet {
            columns: vec!["X".to_string()],
            rows: vec![vec![Value::Integer(1)]],
        })
    }

    fn is_valid(&mut self) -> bool {
        true
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

fn h2_with(driver: Arc<ScriptedDriver>) -> H2 {
    let mut registry = DriverRegistry::new();
    registry.register_shared(driver);
    H2::new("[Inventory] ", "/tmp", "mydb")
        .unwrap()
        .with_drivers(Arc::new(registry))
}

#[test]
fn test_h2_open_classify_close() {
    let driver = Arc::new(ScriptedDriver::default());
    let mut db = h2_with(Arc::clone(&driver));

    assert_eq!(db.state(), LifecycleState::Uninitialized);
    assert!(db.open());
    assert_eq!(db.state(), LifecycleState::Open);
    assert!(db.is_open());

    let descriptors = driver.descriptors.lock().unwrap().clone();
    assert_eq!(descriptors, vec!["jdbc:h2:file:/tmp/mydb.db".to_string()]);

    assert_eq!(db.statement("SELECT * FROM t").unwrap(), H2Statement::Select);
    assert!(matches!(
        db.statement("FOO"),
        Err(DatabaseError::UnknownStatement(token)) if token == "FOO"
    ));
    assert!(matches!(db.is_table("t"), Err(DatabaseError::Unsupported { .. })));
    assert!(matches!(db.truncate("t"), Err(DatabaseError::Unsupported { .. })));

    assert!(db.close());
    assert_eq!(db.state(), LifecycleState::Closed);
    assert!(!db.is_open());
    assert!(db.close());
    assert_eq!(db.state(), LifecycleState::Closed);
}

#[test]
fn test_open_twice_keeps_connection() {
    let driver = Arc::new(ScriptedDriver::default());
    let mut db = h2_with(Arc::clone(&driver));

    assert!(db.open());
    assert!(db.open());
    assert_eq!(driver.connects.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_connection_is_retryable() {
    let driver = Arc::new(ScriptedDriver::default());
    driver.refuse.store(true, Ordering::SeqCst);
    let mut db = h2_with(Arc::clone(&driver));

    assert!(!db.open());
    assert_eq!(db.state(), LifecycleState::Initialized);
    let record = db.last_error().unwrap();
    assert_eq!(
        record.message,
        "Could not establish a H2 connection: database is locked"
    );
    assert!(record.logged);

    driver.refuse.store(false, Ordering::SeqCst);
    assert!(db.open());
    assert_eq!(db.state(), LifecycleState::Open);
    assert_eq!(driver.connects.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reopen_after_close() {
    let driver = Arc::new(ScriptedDriver::default());
    let mut db = h2_with(Arc::clone(&driver));

    assert!(db.open());
    assert!(db.close());
    assert!(db.open());
    assert_eq!(db.state(), LifecycleState::Open);
    assert_eq!(driver.connects.load(Ordering::SeqCst), 2);
}

#[test]
fn test_query_routes_by_statement_kind() {
    let driver = Arc::new(ScriptedDriver::default());
    let mut db = h2_with(Arc::clone(&driver));
    assert!(db.open());

    match db.query("select 1").unwrap() {
        QueryResult::Rows(rows) => assert_eq!(rows.first_value(), Some(&Value::Integer(1))),
        other => panic!("expected rows, got {other:?}"),
    }
    assert_eq!(
        db.query("MERGE INTO t KEY(id) VALUES (1)").unwrap(),
        QueryResult::Updated(1)
    );

    // unknown statements never reach the driver
    assert!(db.query("VACUUM").is_err());
    let executed = driver.executed.lock().unwrap().clone();
    assert_eq!(executed, vec!["select 1", "MERGE INTO t KEY(id) VALUES (1)"]);
}
