//! PostgreSQL backend

use crate::backend::{quote_identifier, quote_literal, Backend};
use crate::driver::{DriverRegistry, POSTGRES_DRIVER};
use crate::error::{DatabaseError, Result};
use crate::instance::DatabaseCore;
use crate::statement::statements;
use crate::target::{Credentials, ServerTarget};
use crate::{DriverKind, LifecycleState};
use std::sync::Arc;

/// Port used when none is configured
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

statements! {
    /// PostgreSQL SQL commands, <https://www.postgresql.org/docs/current/sql-commands.html>
    pub enum PostgresStatement {
        Select("SELECT") rows,
        Insert("INSERT"),
        Update("UPDATE"),
        Delete("DELETE"),
        Merge("MERGE"),
        Copy("COPY"),
        Values("VALUES") rows,
        With("WITH") rows,
        Table("TABLE") rows,
        Create("CREATE"),
        Alter("ALTER"),
        Drop("DROP"),
        Truncate("TRUNCATE"),
        Comment("COMMENT"),
        Grant("GRANT"),
        Revoke("REVOKE"),
        Begin("BEGIN"),
        Start("START"),
        Commit("COMMIT"),
        End("END"),
        Rollback("ROLLBACK"),
        Abort("ABORT"),
        Savepoint("SAVEPOINT"),
        Release("RELEASE"),
        Prepare("PREPARE"),
        Execute("EXECUTE") rows,
        Deallocate("DEALLOCATE"),
        Explain("EXPLAIN") rows,
        Analyze("ANALYZE"),
        Vacuum("VACUUM"),
        Cluster("CLUSTER"),
        Reindex("REINDEX"),
        Lock("LOCK"),
        Listen("LISTEN"),
        Notify("NOTIFY"),
        Unlisten("UNLISTEN"),
        Set("SET"),
        Show("SHOW") rows,
        Reset("RESET"),
        Do("DO"),
        Call("CALL") rows,
        Declare("DECLARE"),
        Fetch("FETCH") rows,
        Move("MOVE"),
        Close("CLOSE"),
        Discard("DISCARD"),
        Checkpoint("CHECKPOINT"),
        Load("LOAD"),
    }
}

/// Server-based PostgreSQL database
pub struct PostgreSql {
    core: DatabaseCore,
    target: ServerTarget,
}

impl PostgreSql {
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
            core: DatabaseCore::new(DriverKind::PostgreSQL, prefix),
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
                "cannot change the server of an open PostgreSQL database".to_string(),
            )));
        }
        self.target = target;
        Ok(())
    }

    /// `postgres://<host>:<port>/<database>`
    pub fn descriptor(&self) -> String {
        self.target.descriptor("postgres")
    }
}

impl Backend for PostgreSql {
    type Statement = PostgresStatement;

    fn core(&self) -> &DatabaseCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DatabaseCore {
        &mut self.core
    }

    fn initialize(&mut self) -> bool {
        self.core.load_driver(POSTGRES_DRIVER)
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
            .connect(POSTGRES_DRIVER, &descriptor, Some(self.target.credentials()))
    }

    fn is_table(&mut self, table: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = {};",
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
            .run_update(&format!("TRUNCATE TABLE {};", quote_identifier(table, '"')))?;
        self.core.log().info(&format!("Truncated \"{table}\""));
        Ok(true)
    }
}
