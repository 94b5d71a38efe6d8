//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system including
//! Migration, MigrationOperation, MigrationRecord, and MigrationConfig.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_core::config::validate_sql_identifier;
use keel_core::AppConfig;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::database::Database;
use crate::error::{OrmError, OrmResult};

/// One direction of a schema change
#[async_trait]
pub trait MigrationOperation: Send + Sync {
    /// Apply the change against `db`
    async fn apply(&self, db: &dyn Database) -> OrmResult<()>;
}

/// A SQL body executed as a single opaque unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlOperation {
    sql: String,
}

impl SqlOperation {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl MigrationOperation for SqlOperation {
    async fn apply(&self, db: &dyn Database) -> OrmResult<()> {
        if self.sql.trim().is_empty() {
            return Ok(());
        }
        db.execute(&self.sql, &[]).await?;
        Ok(())
    }
}

/// Represents a registered database migration
#[derive(Clone)]
pub struct Migration {
    /// Unique identifier, sortable in execution order (typically a UTC timestamp)
    pub id: String,
    /// Operation applying the change
    pub up: Arc<dyn MigrationOperation>,
    /// Operation reverting the change
    pub down: Arc<dyn MigrationOperation>,
}

impl Migration {
    /// Operation for the given direction
    pub fn operation(&self, direction: MigrationDirection) -> &dyn MigrationOperation {
        match direction {
            MigrationDirection::Up => self.up.as_ref(),
            MigrationDirection::Down => self.down.as_ref(),
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Ledger row for an applied migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    /// Migration ID
    pub id: String,
    /// When the migration was applied
    pub created: DateTime<Utc>,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
}

impl MigrationConfig {
    /// Check that the table name is safe to interpolate into SQL
    pub fn validate(&self) -> OrmResult<()> {
        validate_sql_identifier("migrations_table", &self.migrations_table)?;
        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: "migrations".to_string(),
        }
    }
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            migrations_dir: config.migrations_dir.clone(),
            migrations_table: config.migrations_table.clone(),
        }
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Apply the migration
    Up,
    /// Revert the migration
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MigrationState {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied {
        /// When it was applied
        created: DateTime<Utc>,
    },
}

/// A registered migration paired with its ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub id: String,
    #[serde(flatten)]
    pub state: MigrationState,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self.state, MigrationState::Applied { .. })
    }
}

/// Result of running migrations up
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    /// IDs of migrations that were applied, in order
    pub applied_migrations: Vec<String>,
    /// Set when a migration's up operation failed and the run stopped there
    pub failure: Option<OrmError>,
}

impl MigrationRunResult {
    /// Number of migrations that were applied
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }

    /// True when every pending migration up to the target was applied
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of rolling back migrations
#[derive(Debug, Default)]
pub struct RollbackResult {
    /// ID of the migration that was rolled back, if any
    pub rolled_back: Option<String>,
    /// Set when the down operation failed; the ledger is left untouched
    pub failure: Option<OrmError>,
}

impl RollbackResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
