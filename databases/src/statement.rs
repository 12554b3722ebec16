//! Statement vocabularies and the keyword classifier
//!
//! Each backend declares a closed enum of the statement keywords its dialect
//! accepts. Classification looks only at the leading keyword of a query; it
//! never validates the rest of the statement.

use crate::DriverKind;
use crate::error::{DatabaseError, Result};
use serde::Serialize;
use std::fmt;

/// A backend's closed statement vocabulary
pub trait StatementKind: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Every variant, in declaration order
    const ALL: &'static [Self];

    /// Canonical uppercase keyword
    fn keyword(self) -> &'static str;

    /// Whether statements of this kind produce a row set
    fn returns_rows(self) -> bool;

    /// Exact lookup of an uppercase keyword
    fn from_keyword(keyword: &str) -> Option<Self>;
}

/// Declares a statement vocabulary enum.
///
/// Variants marked `rows` produce a row set when executed.
macro_rules! statements {
    (@rows rows) => {
        true
    };
    (@rows) => {
        false
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident ( $keyword:literal ) $($rows:ident)? ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )*
        }

        impl $crate::statement::StatementKind for $name {
            const ALL: &'static [Self] = &[ $( Self::$variant, )* ];

            fn keyword(self) -> &'static str {
                match self {
                    $( Self::$variant => $keyword, )*
                }
            }

            fn returns_rows(self) -> bool {
                match self {
                    $( Self::$variant => $crate::statement::statements!(@rows $($rows)?), )*
                }
            }

            fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $( $keyword => Some(Self::$variant), )*
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::statement::StatementKind::keyword(*self))
            }
        }
    };
}

pub(crate) use statements;

/// Resolve the leading keyword of `query` against vocabulary `S`.
///
/// The query is trimmed and split once on whitespace; the first part is
/// uppercased and matched exactly. On failure the error carries the token as
/// written, so `classify("foo bar")` fails with `UnknownStatement("foo")`.
/// Case folding is ASCII-only; every vocabulary keyword is ASCII.
pub fn classify<S: StatementKind>(query: &str) -> Result<S> {
    let candidate = query
        .trim()
        .splitn(2, char::is_whitespace)
        .next()
        .unwrap_or_default();

    S::from_keyword(&candidate.to_ascii_uppercase())
        .ok_or_else(|| DatabaseError::UnknownStatement(candidate.to_string()))
}

/// A classified statement with its vocabulary erased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Backend whose vocabulary produced the match
    pub driver: DriverKind,
    /// Canonical keyword
    pub keyword: &'static str,
    /// Whether the statement produces a row set
    pub returns_rows: bool,
}

impl Statement {
    pub fn of<S: StatementKind>(driver: DriverKind, kind: S) -> Self {
        Self {
            driver,
            keyword: kind.keyword(),
            returns_rows: kind.returns_rows(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    statements! {
        enum Toy {
            Select("SELECT") rows,
            Insert("INSERT"),
            Commit("COMMIT"),
        }
    }

    #[test]
    fn test_classify_folds_ascii_only() {
        assert_eq!(classify::<Toy>("Commit").unwrap(), Toy::Commit);
        // U+017F folds to 'S' only under Unicode rules
        assert!(matches!(
            classify::<Toy>("\u{17f}elect 1"),
            Err(DatabaseError::UnknownStatement(token)) if token == "\u{17f}elect"
        ));
    }

    #[test]
    fn test_classify_matches_leading_keyword() {
        assert_eq!(classify::<Toy>("SELECT * FROM t").unwrap(), Toy::Select);
        assert_eq!(classify::<Toy>("insert into t values (1)").unwrap(), Toy::Insert);
        assert_eq!(classify::<Toy>("  Select\t1  ").unwrap(), Toy::Select);
        assert_eq!(classify::<Toy>("SELECT\n*\nFROM t").unwrap(), Toy::Select);
    }

    #[test]
    fn test_classify_single_keyword() {
        assert_eq!(classify::<Toy>("COMMIT").unwrap(), Toy::Commit);
        assert_eq!(
            classify::<Toy>("COMMIT").unwrap(),
            classify::<Toy>("COMMIT ").unwrap()
        );
    }

    #[test]
    fn test_classify_unknown_keeps_original_casing() {
        match classify::<Toy>("foo BAR") {
            Err(DatabaseError::UnknownStatement(token)) => assert_eq!(token, "foo"),
            other => panic!("expected UnknownStatement, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_empty_query() {
        for query in ["", "   ", "\t\n"] {
            match classify::<Toy>(query) {
                Err(DatabaseError::UnknownStatement(token)) => assert_eq!(token, ""),
                other => panic!("expected UnknownStatement for {query:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_classify_requires_exact_keyword() {
        assert!(classify::<Toy>("SEL * FROM t").is_err());
        assert!(classify::<Toy>("SELECTED * FROM t").is_err());
        assert!(classify::<Toy>("SELECT(1)").is_err());
    }

    #[test]
    fn test_vocabulary_metadata() {
        assert_eq!(Toy::ALL.len(), 3);
        assert!(Toy::Select.returns_rows());
        assert!(!Toy::Insert.returns_rows());
        assert_eq!(Toy::Commit.to_string(), "COMMIT");
        assert_eq!(Toy::from_keyword("commit"), None);
    }

    #[test]
    fn test_erased_statement() {
        let statement = Statement::of(DriverKind::SQLite, Toy::Select);
        assert_eq!(statement.keyword, "SELECT");
        assert!(statement.returns_rows);
        assert_eq!(statement.driver, DriverKind::SQLite);
    }
}
