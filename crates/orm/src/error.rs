//! Error types for the database layer
//!
//! Distinguishes storage connectivity problems, which abort a migration run
//! before anything is attempted, from failures of individual migration
//! operations, which the runner reports and stops on.

use keel_core::ConfigError;
use thiserror::Error;

use crate::migrations::MigrationDirection;

/// Result type alias for database layer operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database layer operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Storage could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement reached storage and failed
    #[error("Database error: {0}")]
    Database(String),

    /// A migration's up or down operation failed
    #[error("Error running {direction} for migration '{id}': {message}")]
    Migration {
        id: String,
        direction: MigrationDirection,
        message: String,
    },

    /// Caller passed an argument the operation does not support
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Migration definitions or settings are inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem error while reading or writing migration files
    #[error("IO error: {0}")]
    Io(String),
}

impl OrmError {
    /// Wrap a failed migration operation
    pub fn migration(
        id: impl Into<String>,
        direction: MigrationDirection,
        source: impl std::fmt::Display,
    ) -> Self {
        Self::Migration {
            id: id.into(),
            direction,
            message: source.to_string(),
        }
    }

    /// Check if storage was unreachable
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => OrmError::Connection(err.to_string()),
            other => OrmError::Database(other.to_string()),
        }
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        OrmError::Io(err.to_string())
    }
}

impl From<ConfigError> for OrmError {
    fn from(err: ConfigError) -> Self {
        OrmError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_message() {
        let err = OrmError::migration("20240101000000_users", MigrationDirection::Up, "syntax error");
        assert_eq!(
            err.to_string(),
            "Error running up for migration '20240101000000_users': syntax error"
        );
    }

    #[test]
    fn test_sqlx_errors_are_classified() {
        assert!(OrmError::from(sqlx::Error::PoolTimedOut).is_connection());
        assert!(!OrmError::from(sqlx::Error::RowNotFound).is_connection());
    }
}
