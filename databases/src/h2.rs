//! H2 backend
//!
//! H2 is a file-based engine with no native Rust driver: the host registers
//! a bridge under [`H2_DRIVER`] in the registry it hands to [`H2::with_drivers`].
//! Without one, `open` fails with `DriverUnavailable`.

use crate::backend::Backend;
use crate::driver::{DriverRegistry, H2_DRIVER};
use crate::error::Result;
use crate::instance::DatabaseCore;
use crate::statement::statements;
use crate::target::FileTarget;
use crate::{DriverKind, LifecycleState};
use std::path::Path;
use std::sync::Arc;

statements! {
    /// Statements of the H2 grammar, <http://www.h2database.com/html/grammar.html>
    pub enum H2Statement {
        // Data manipulation
        Select("SELECT") rows,
        Insert("INSERT"),
        Update("UPDATE"),
        Delete("DELETE"),
        Backup("BACKUP"),
        Call("CALL") rows,
        Explain("EXPLAIN") rows,
        Merge("MERGE"),
        RunScript("RUNSCRIPT"),
        Script("SCRIPT") rows,
        Show("SHOW") rows,

        // Data definition
        Alter("ALTER"),
        Constraint("CONSTRAINT"),
        Analyze("ANALYZE"),
        Comment("COMMENT"),
        Create("CREATE"),
        Drop("DROP"),
        Truncate("TRUNCATE"),

        // Other
        Checkpoint("CHECKPOINT"),
        Commit("COMMIT"),
        Grant("GRANT"),
        Help("HELP") rows,
        Prepare("PREPARE"),
        Revoke("REVOKE"),
        Rollback("ROLLBACK"),
        Savepoint("SAVEPOINT"),
        Set("SET"),
        Shutdown("SHUTDOWN"),
    }
}

/// File-based H2 database
pub struct H2 {
    core: DatabaseCore,
    file: FileTarget,
}

impl H2 {
    /// `<directory>/<filename>.db`
    pub fn new<P: AsRef<Path>>(
        prefix: impl Into<String>,
        directory: P,
        filename: &str,
    ) -> Result<Self> {
        Ok(Self {
            core: DatabaseCore::new(DriverKind::H2, prefix),
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
            core: DatabaseCore::new(DriverKind::H2, prefix),
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
            return Err(self.core.fail(crate::DatabaseError::InvalidTarget(
                "cannot change the file of an open H2 database".to_string(),
            )));
        }
        self.file = file;
        Ok(())
    }
}

impl Backend for H2 {
    type Statement = H2Statement;

    fn core(&self) -> &DatabaseCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DatabaseCore {
        &mut self.core
    }

    fn initialize(&mut self) -> bool {
        self.core.load_driver(H2_DRIVER)
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
                    .write_error(format!("Could not prepare H2 database file: {e}"), true);
                return false;
            }
        };

        let descriptor = format!("jdbc:h2:file:{}", path.display());
        self.core.connect(H2_DRIVER, &descriptor, None)
    }

    fn is_table(&mut self, _table: &str) -> Result<bool> {
        Err(self.core.unsupported("isTable"))
    }

    fn truncate(&mut self, _table: &str) -> Result<bool> {
        Err(self.core.unsupported("truncate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementKind;
    use crate::DatabaseError;

    fn offline_h2() -> H2 {
        H2::new("[Test] ", "/tmp", "mydb")
            .unwrap()
            .with_drivers(Arc::new(DriverRegistry::new()))
    }

    #[test]
    fn test_h2_vocabulary() {
        assert_eq!(H2Statement::ALL.len(), 28);
        assert_eq!(H2Statement::from_keyword("RUNSCRIPT"), Some(H2Statement::RunScript));
        assert!(H2Statement::Select.returns_rows());
        assert!(!H2Statement::Merge.returns_rows());
    }

    #[test]
    fn test_h2_open_without_driver() {
        let mut db = offline_h2();
        assert!(!db.open());
        assert_eq!(db.state(), LifecycleState::Uninitialized);
        assert!(db.last_error().unwrap().message.starts_with("H2 driver missing"));
    }

    #[test]
    fn test_h2_classification() {
        let mut db = offline_h2();
        assert_eq!(db.statement("SELECT * FROM t").unwrap(), H2Statement::Select);
        assert!(matches!(
            db.statement("FOO BAR"),
            Err(DatabaseError::UnknownStatement(token)) if token == "FOO"
        ));
        assert_eq!(
            db.last_error().unwrap().message,
            "Unknown statement: \"FOO\"."
        );
    }

    #[test]
    fn test_h2_introspection_unsupported() {
        let mut db = offline_h2();
        assert!(matches!(db.is_table("t"), Err(DatabaseError::Unsupported { .. })));
        assert!(matches!(db.truncate("t"), Err(DatabaseError::Unsupported { .. })));
    }

    #[test]
    fn test_h2_set_file() {
        let mut db = offline_h2();
        db.set_file(FileTarget::new("/var/tmp", "other").unwrap()).unwrap();
        assert_eq!(db.file().filename(), "other");
    }
}
