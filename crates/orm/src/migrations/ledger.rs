//! Migration Ledger - persisted record of applied migrations
//!
//! Every read or write first makes sure the ledger table exists; the DDL is
//! `CREATE TABLE IF NOT EXISTS` so repeating it is harmless. Each write is a
//! single statement against storage.

use std::sync::Arc;

use super::definitions::{MigrationConfig, MigrationRecord};
use crate::database::{Database, DatabaseValue};
use crate::error::{OrmError, OrmResult};

/// Ledger of applied migrations stored in `MigrationConfig::migrations_table`
#[derive(Clone)]
pub struct MigrationLedger {
    db: Arc<dyn Database>,
    table: String,
}

impl MigrationLedger {
    /// Create a ledger over `db`, validating the configured table name
    pub fn new(db: Arc<dyn Database>, config: &MigrationConfig) -> OrmResult<Self> {
        config.validate()?;
        Ok(Self {
            db,
            table: config.migrations_table.clone(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist yet
    pub async fn ensure_table(&self) -> OrmResult<()> {
        self.db.execute(&self.create_table_sql(), &[]).await?;
        Ok(())
    }

    /// Greatest recorded identifier, or `None` when nothing has been applied
    pub async fn last_applied_id(&self) -> OrmResult<Option<String>> {
        self.ensure_table().await?;

        let sql = format!("SELECT id FROM {} ORDER BY id DESC LIMIT 1", self.table);
        match self.db.query_one(&sql, &[]).await? {
            None | Some(DatabaseValue::Null) => Ok(None),
            Some(DatabaseValue::String(id)) => Ok(Some(id)),
            Some(other) => Err(OrmError::Database(format!(
                "Unexpected value in {}.id: {:?}",
                self.table, other
            ))),
        }
    }

    /// Record `id` as applied
    pub async fn record(&self, id: &str) -> OrmResult<()> {
        self.ensure_table().await?;

        let sql = format!("INSERT INTO {} (id, created) VALUES ($1, NOW())", self.table);
        self.db.execute(&sql, &[DatabaseValue::from(id)]).await?;
        Ok(())
    }

    /// Remove the ledger row for `id`
    pub async fn remove(&self, id: &str) -> OrmResult<()> {
        self.ensure_table().await?;

        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        self.db.execute(&sql, &[DatabaseValue::from(id)]).await?;
        Ok(())
    }

    /// All ledger rows, ascending by identifier
    pub async fn applied(&self) -> OrmResult<Vec<MigrationRecord>> {
        self.ensure_table().await?;

        let sql = format!("SELECT id, created FROM {} ORDER BY id ASC", self.table);
        let rows = self.db.query_all(&sql, &[]).await?;

        rows.into_iter()
            .map(|row| match row.as_slice() {
                [DatabaseValue::String(id), DatabaseValue::DateTime(created)] => Ok(MigrationRecord {
                    id: id.clone(),
                    created: *created,
                }),
                other => Err(OrmError::Database(format!(
                    "Unexpected row in {}: {:?}",
                    self.table, other
                ))),
            })
            .collect()
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id text,\n    \
                created timestamp NOT NULL,\n    \
                PRIMARY KEY (id)\n\
            )",
            self.table
        )
    }
}
