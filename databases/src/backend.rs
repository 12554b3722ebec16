//! The Backend contract
//!
//! A backend is one engine: its statement vocabulary, its connection
//! descriptor, its driver, and whatever table introspection its dialect can
//! offer. Everything common lives in [`DatabaseCore`].

use crate::driver::ResultSet;
use crate::error::Result;
use crate::instance::{DatabaseCore, ErrorRecord};
use crate::statement::{classify, StatementKind};
use crate::{DriverKind, LifecycleState};
use serde::Serialize;

/// Outcome of [`Backend::query`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    /// Rows from a row-producing statement
    Rows(ResultSet),
    /// Affected row count from any other statement
    Updated(u64),
}

/// Capability set every engine implements
///
/// `open`, `close` and `initialize` report failure as `false` and leave the
/// reason in [`Backend::last_error`]; they never return a driver error
/// directly. The remaining operations return typed errors, which are recorded
/// the same way.
pub trait Backend {
    /// The dialect's statement vocabulary
    type Statement: StatementKind;

    fn core(&self) -> &DatabaseCore;

    fn core_mut(&mut self) -> &mut DatabaseCore;

    /// Check that this backend's driver is available
    fn initialize(&mut self) -> bool;

    /// Initialize, then connect to the configured target.
    ///
    /// Returns `true` without reconnecting when a handle is already held.
    fn open(&mut self) -> bool;

    /// Release the handle; calling it again is a no-op
    fn close(&mut self) -> bool {
        self.core_mut().close()
    }

    /// Resolve the leading keyword of `query` in this dialect
    fn statement(&mut self, query: &str) -> Result<Self::Statement> {
        classify::<Self::Statement>(query).map_err(|e| self.core_mut().fail(e))
    }

    /// Dialect-specific checks on a classified statement
    ///
    /// Failures must be recorded through [`DatabaseCore::fail`].
    fn validate(&mut self, _statement: Self::Statement) -> Result<()> {
        Ok(())
    }

    /// Whether `table` exists; may fail with `Unsupported`
    fn is_table(&mut self, table: &str) -> Result<bool>;

    /// Delete every row of `table`; may fail with `Unsupported`
    fn truncate(&mut self, table: &str) -> Result<bool>;

    fn driver(&self) -> DriverKind {
        self.core().driver()
    }

    fn state(&self) -> LifecycleState {
        self.core().state()
    }

    fn last_error(&self) -> Option<&ErrorRecord> {
        self.core().last_error()
    }

    /// True when a handle is held and answers a round trip
    fn is_open(&mut self) -> bool {
        self.core_mut().is_valid()
    }

    /// Classify, validate, then run `sql` on the open handle
    ///
    /// Row-producing keywords, and data changes carrying a `RETURNING`
    /// clause, come back as [`QueryResult::Rows`].
    fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = self.statement(sql)?;
        self.validate(statement)?;

        let core = self.core_mut();
        core.log().debug(&format!("Executing {statement} statement"));
        if statement.returns_rows() || has_returning_clause(sql) {
            core.run_query(sql).map(QueryResult::Rows)
        } else {
            core.run_update(sql).map(QueryResult::Updated)
        }
    }
}

/// Whether `sql` has a `RETURNING` keyword outside quoted text
pub(crate) fn has_returning_clause(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut word = String::new();

    for c in sql.chars().chain(std::iter::once(' ')) {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if word.eq_ignore_ascii_case("RETURNING") {
            return true;
        }
        word.clear();
        if matches!(c, '\'' | '"' | '`') {
            quote = Some(c);
        }
    }
    false
}

/// `'...'` literal with embedded quotes doubled
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Identifier wrapped in `quote`, with embedded quotes doubled
pub(crate) fn quote_identifier(name: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    format!("{quote}{}{quote}", name.replace(quote, &doubled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("users"), "'users'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_returning_clause_detection() {
        assert!(has_returning_clause("INSERT INTO t (name) VALUES ('x') RETURNING id"));
        assert!(has_returning_clause("delete from t where id = 1 returning *"));
        assert!(has_returning_clause("UPDATE t SET n = 1 RETURNING\tn"));
        assert!(!has_returning_clause("INSERT INTO t (name) VALUES ('returning')"));
        assert!(!has_returning_clause("UPDATE \"returning\" SET n = 1"));
        assert!(!has_returning_clause("INSERT INTO t (returning_id) VALUES (1)"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users", '"'), "\"users\"");
        assert_eq!(quote_identifier("we\"ird", '"'), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("my`table", '`'), "`my``table`");
    }
}
