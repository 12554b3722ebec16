//! CLI module
//!
//! Provides:
//! - Argument parsing (clap derive)
//! - Config loading and backend construction
//! - Command dispatch with deterministic exit codes

pub mod args;
pub mod dispatch;

// Re-exports
pub use args::{Cli, Command, DEFAULT_CONFIG_FILE};
pub use dispatch::{run_cli, ExitCode};

use sqlhub_databases::{ConfigError, DatabaseError};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Statement(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DatabaseError> for Error {
    fn from(e: DatabaseError) -> Self {
        if e.is_statement_error() {
            Error::Statement(e.to_string())
        } else {
            Error::Database(e.to_string())
        }
    }
}

impl Error {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Database(_) => EXIT_DB_ERROR,
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_DB_ERROR: i32 = 2;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
