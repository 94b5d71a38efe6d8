//! Database collaborator interface
//!
//! The migration subsystem only needs parametrized statements and simple
//! reads, so the collaborator is kept to three calls. Placeholders follow the
//! PostgreSQL `$1, $2, ...` convention.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OrmResult;

/// A single SQL parameter or column value
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Int64(i64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl DatabaseValue {
    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

/// Storage collaborator used by the migration ledger and by migration operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    ///
    /// With no parameters the SQL may contain several `;`-separated statements.
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Return the first column of the first row, or `None` when there are no rows
    async fn query_one(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<DatabaseValue>>;

    /// Return every row as a list of column values
    async fn query_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Vec<DatabaseValue>>>;
}
