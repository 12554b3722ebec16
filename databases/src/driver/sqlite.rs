//! SQLite driver backed by rusqlite

use super::{Connection, Driver, DriverError, ResultSet, Value, SQLITE_DRIVER};
use crate::target::Credentials;
use rusqlite::types::ValueRef;
use rusqlite::OpenFlags;
use std::time::Duration;
use tracing::debug;

/// Opens `file:` URI descriptors with rusqlite
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        SQLITE_DRIVER
    }

    fn connect(
        &self,
        descriptor: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, DriverError> {
        debug!("Opening SQLite database: {descriptor}");

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(descriptor, flags)?;

        conn.busy_timeout(Duration::from_secs(30))?;

        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        let changed = self.conn.execute(sql, [])?;
        Ok(changed as u64)
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|index| row.get_ref(index).map(Value::from))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ResultSet { columns, rows })
    }

    fn is_valid(&mut self) -> bool {
        self.conn.query_row("SELECT 1;", [], |_| Ok(())).is_ok()
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, e)| DriverError::Sqlite(e))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        }
    }
}
