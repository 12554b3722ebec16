//! SQLite backend
//!
//! File-based engine driven by rusqlite. SQLite has no TRUNCATE, so
//! [`Sqlite::truncate`] deletes every row and resets the table's
//! AUTOINCREMENT counter.

use crate::backend::{quote_identifier, quote_literal, Backend};
use crate::driver::{DriverRegistry, SQLITE_DRIVER};
use crate::error::{DatabaseError, Result};
use crate::instance::DatabaseCore;
use crate::statement::statements;
use crate::target::FileTarget;
use crate::{DriverKind, LifecycleState};
use std::path::Path;
use std::sync::Arc;

const TRUNCATE_SAVEPOINT: &str = "sqlhub_truncate";

statements! {
    /// Statements of the SQLite grammar, <https://www.sqlite.org/lang.html>
    pub enum SqliteStatement {
        Select("SELECT") rows,
        Insert("INSERT"),
        Update("UPDATE"),
        Delete("DELETE"),
        Replace("REPLACE"),
        Create("CREATE"),
        Alter("ALTER"),
        Drop("DROP"),
        Analyze("ANALYZE"),
        Attach("ATTACH"),
        Detach("DETACH"),
        Begin("BEGIN"),
        End("END"),
        Commit("COMMIT"),
        Rollback("ROLLBACK"),
        Savepoint("SAVEPOINT"),
        Release("RELEASE"),
        Explain("EXPLAIN") rows,
        Pragma("PRAGMA") rows,
        Reindex("REINDEX"),
        Vacuum("VACUUM"),
        With("WITH") rows,
        Values("VALUES") rows,
    }
}

/// File-based SQLite database
pub struct Sqlite {
    core: DatabaseCore,
    file: FileTarget,
}

impl Sqlite {
    /// `<directory>/<filename>.db`
    pub fn new<P: AsRef<Path>>(
        prefix: impl Into<String>,
        directory: P,
        filename: &str,
    ) -> Result<Self> {
        Ok(Self {
            core: DatabaseCore::new(DriverKind::SQLite, prefix),
            file: FileTarget::new(directory, filename)?,
        })
    }

    /// `<directory>/<filename><extension>`
    pub fn with_extension<P: AsRef<Path>>(
        prefix: impl Into<String>,
        directory: P,
        filename: &str,
        extension: &str,
    ) -> Result<Self> {
        Ok(Self {
            core: DatabaseCore::new(DriverKind::SQLite, prefix),
            file: FileTarget::with_extension(directory, filename, extension)?,
        })
    }

    /// Consult `drivers` instead of the builtin registry
    pub fn with_drivers(mut self, drivers: Arc<DriverRegistry>) -> Self {
        self.core.set_drivers(drivers);
        self
    }

    pub fn file(&self) -> &FileTarget {
        &self.file
    }

    /// Retarget the instance; refused while a connection is open
    pub fn set_file(&mut self, file: FileTarget) -> Result<()> {
        if self.core.state() == LifecycleState::Open {
            return Err(self.core.fail(DatabaseError::InvalidTarget(
                "cannot change the file of an open SQLite database".to_string(),
            )));
        }
        self.file = file;
        Ok(())
    }

    /// Delete every row of `table` and reset its AUTOINCREMENT counter
    fn clear_table(&mut self, table: &str) -> Result<u64> {
        let deleted = self
            .core
            .run_update(&format!("DELETE FROM {};", quote_identifier(table, '"')))?;

        if self.is_table("sqlite_sequence")? {
            self.core.run_update(&format!(
                "DELETE FROM sqlite_sequence WHERE name = {};",
                quote_literal(table)
            ))?;
        }
        Ok(deleted)
    }
}

/// SQLite URI filename for `path`; `%`, `?` and `#` are escaped
fn uri_filename(path: &Path) -> String {
    let path = path.to_string_lossy();
    let mut uri = String::with_capacity(path.len() + 5);
    uri.push_str("file:");
    for c in path.chars() {
        match c {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            c => uri.push(c),
        }
    }
    uri
}

impl Backend for Sqlite {
    type Statement = SqliteStatement;

    fn core(&self) -> &DatabaseCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DatabaseCore {
        &mut self.core
    }

    fn initialize(&mut self) -> bool {
        self.core.load_driver(SQLITE_DRIVER)
    }

    fn open(&mut self) -> bool {
        if self.core.has_connection() {
            return true;
        }
        if !self.initialize() {
            return false;
        }

        let path = match self.file.prepare() {
            Ok(path) => path,
            Err(e) => {
                self.core
                    .write_error(format!("Could not prepare SQLite database file: {e}"), true);
                return false;
            }
        };

        self.core.connect(SQLITE_DRIVER, &uri_filename(&path), None)
    }

    fn is_table(&mut self, table: &str) -> Result<bool> {
        let sql = format!(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = {};",
            quote_literal(table)
        );
        let rows = self.core.run_query(&sql)?;
        Ok(!rows.is_empty())
    }

    fn truncate(&mut self, table: &str) -> Result<bool> {
        if !self.is_table(table)? {
            self.core
                .write_error(format!("Table \"{table}\" does not exist."), true);
            return Ok(false);
        }

        self.core
            .run_update(&format!("SAVEPOINT {TRUNCATE_SAVEPOINT};"))?;
        let deleted = match self.clear_table(table) {
            Ok(deleted) => deleted,
            Err(e) => {
                let _ = self
                    .core
                    .run_update(&format!("ROLLBACK TO {TRUNCATE_SAVEPOINT};"));
                let _ = self
                    .core
                    .run_update(&format!("RELEASE {TRUNCATE_SAVEPOINT};"));
                // the original failure stays the recorded one
                self.core.write_error(e.to_string(), true);
                return Err(e);
            }
        };
        self.core
            .run_update(&format!("RELEASE {TRUNCATE_SAVEPOINT};"))?;

        self.core
            .log()
            .info(&format!("Truncated \"{table}\" ({deleted} rows)"));
        Ok(true)
    }
}
