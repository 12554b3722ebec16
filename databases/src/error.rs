//! Error taxonomy shared by every backend

use crate::DriverKind;
use crate::driver::DriverError;

/// Backend errors
///
/// Every variant is recoverable by the caller. Failures are also written to the
/// owning instance's [`ErrorRecord`](crate::ErrorRecord) before being returned.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("{driver} driver missing: {message}")]
    DriverUnavailable { driver: DriverKind, message: String },

    #[error("Could not establish a {driver} connection: {message}")]
    ConnectionFailure { driver: DriverKind, message: String },

    #[error("Unknown statement: \"{0}\".")]
    UnknownStatement(String),

    #[error("Invalid {statement} statement: {reason}")]
    Validation {
        statement: &'static str,
        reason: String,
    },

    #[error("{operation} is not supported by {driver}")]
    Unsupported {
        driver: DriverKind,
        operation: &'static str,
    },

    #[error("{driver} connection is not open")]
    NotOpen { driver: DriverKind },

    #[error("Invalid connection target: {0}")]
    InvalidTarget(String),

    #[error("{driver} driver error: {source}")]
    Driver {
        driver: DriverKind,
        #[source]
        source: DriverError,
    },
}

impl DatabaseError {
    /// True for failures caused by the submitted query text rather than the backend
    pub fn is_statement_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::UnknownStatement(_) | DatabaseError::Validation { .. }
        )
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, DatabaseError>;
