//! MySQL backend
//!
//! `USE` is refused: an instance stays bound to the database named in its
//! target, so switching schemas means opening another instance.

use crate::backend::{quote_identifier, Backend};
use crate::driver::{DriverRegistry, MYSQL_DRIVER};
use crate::error::{DatabaseError, Result};
use crate::instance::DatabaseCore;
use crate::statement::statements;
use crate::target::{Credentials, ServerTarget};
use crate::{DriverKind, LifecycleState};
use std::sync::Arc;

/// Port used when none is configured
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

statements! {
    /// MySQL SQL statements, <https://dev.mysql.com/doc/refman/8.0/en/sql-statements.html>
    pub enum MySqlStatement {
        // Data manipulation
        Select("SELECT") rows,
        Insert("INSERT"),
        Update("UPDATE"),
        Delete("DELETE"),
        Replace("REPLACE"),
        Call("CALL") rows,
        Do("DO"),
        Handler("HANDLER") rows,
        Load("LOAD"),
        With("WITH") rows,
        Table("TABLE") rows,
        Values("VALUES") rows,

        // Data definition
        Create("CREATE"),
        Alter("ALTER"),
        Drop("DROP"),
        Rename("RENAME"),
        Truncate("TRUNCATE"),

        // Transactions and locking
        Start("START"),
        Begin("BEGIN"),
        Commit("COMMIT"),
        Rollback("ROLLBACK"),
        Savepoint("SAVEPOINT"),
        Release("RELEASE"),
        Lock("LOCK"),
        Unlock("UNLOCK"),

        // Prepared statements
        Prepare("PREPARE"),
        Execute("EXECUTE") rows,
        Deallocate("DEALLOCATE"),

        // Administration and utility
        Set("SET"),
        Show("SHOW") rows,
        Describe("DESCRIBE") rows,
        Desc("DESC") rows,
        Explain("EXPLAIN") rows,
        Use("USE"),
        Grant("GRANT"),
        Revoke("REVOKE"),
        Analyze("ANALYZE") rows,
        Check("CHECK") rows,
        Checksum("CHECKSUM") rows,
        Optimize("OPTIMIZE") rows,
        Repair("REPAIR") rows,
        Flush("FLUSH"),
        Kill("KILL"),
        Reset("RESET"),
    }
}

/// Server-based MySQL database
pub struct MySql {
    core: DatabaseCore,
    target: ServerTarget,
}

impl MySql {
    pub fn new(
        prefix: impl Into<String>,
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let credentials = Credentials::new(username, password);
        Ok(Self {
            core: DatabaseCore::new(DriverKind::MySQL, prefix),
            target: ServerTarget::new(host, port, database, credentials)?,
        })
    }

    /// Consult `drivers` instead of the builtin registry
    pub fn with_drivers(mut self, drivers: Arc<DriverRegistry>) -> Self {
        self.core.set_drivers(drivers);
        self
    }

    pub fn target(&self) -> &ServerTarget {
        &self.target
    }

    /// Retarget the instance; refused while a connection is open
    pub fn set_target(&mut self, target: ServerTarget) -> Result<()> {
        if self.core.state() == LifecycleState::Open {
            return Err(self.core.fail(DatabaseError::InvalidTarget(
                "cannot change the server of an open MySQL database".to_string(),
            )));
        }
        self.target = target;
        Ok(())
    }

    /// `mysql://<host>:<port>/<database>`
    pub fn descriptor(&self) -> String {
        self.target.descriptor("mysql")
    }
}

/// String literal safe under MySQL's default backslash escaping
fn mysql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

impl Backend for MySql {
    type Statement = MySqlStatement;

    fn core(&self) -> &DatabaseCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DatabaseCore {
        &mut self.core
    }

    fn initialize(&mut self) -> bool {
        self.core.load_driver(MYSQL_DRIVER)
    }

    fn open(&mut self) -> bool {
        if self.core.has_connection() {
            return true;
        }
        if !self.initialize() {
            return false;
        }

        let descriptor = self.descriptor();
        self.core
            .connect(MYSQL_DRIVER, &descriptor, Some(self.target.credentials()))
    }

    fn validate(&mut self, statement: MySqlStatement) -> Result<()> {
        match statement {
            MySqlStatement::Use => Err(self.core.fail(DatabaseError::Validation {
                statement: "USE",
                reason: "open a new connection to use a different database".to_string(),
            })),
            _ => Ok(()),
        }
    }

    fn is_table(&mut self, table: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = {};",
            mysql_literal(table)
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
            .run_update(&format!("TRUNCATE TABLE {};", quote_identifier(table, '`')))?;
        self.core.log().info(&format!("Truncated \"{table}\""));
        Ok(true)
    }
}
