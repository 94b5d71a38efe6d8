//! PostgreSQL Backend Implementation
//!
//! Implements the [`Database`] collaborator with sqlx as the underlying driver.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, PgPool, Postgres, Row, TypeInfo, ValueRef};
use std::time::Duration;

use crate::database::{Database, DatabaseValue};
use crate::error::{OrmError, OrmResult};

/// Pool settings for [`PostgresDatabase::connect_with`]
#[derive(Debug, Clone)]
pub struct PostgresPoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PostgresPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// PostgreSQL database collaborator
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with explicit pool settings.
    ///
    /// Fails with [`OrmError::Connection`] when the server cannot be reached.
    pub async fn connect_with(database_url: &str, config: PostgresPoolConfig) -> OrmResult<Self> {
        validate_database_url(database_url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| OrmError::Connection(format!("Failed to connect to database: {}", e)))?;

        Ok(Self::new(pool))
    }
}

/// Reject URLs that are not PostgreSQL URLs before trying to connect
pub fn validate_database_url(url: &str) -> OrmResult<()> {
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        return Err(OrmError::Connection("Invalid PostgreSQL URL scheme".to_string()));
    }
    Ok(())
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        tracing::debug!(target: "keel_orm::sql", sql, params = ?params, "execute");

        // no arguments means the simple query protocol, which allows several statements
        let result = if params.is_empty() {
            self.pool.execute(sql).await?
        } else {
            bind_all(sqlx::query(sql), params).execute(&self.pool).await?
        };

        Ok(result.rows_affected())
    }

    async fn query_one(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<DatabaseValue>> {
        tracing::debug!(target: "keel_orm::sql", sql, params = ?params, "query_one");

        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) if !row.columns().is_empty() => Ok(Some(column_value(&row, 0)?)),
            _ => Ok(None),
        }
    }

    async fn query_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Vec<DatabaseValue>>> {
        tracing::debug!(target: "keel_orm::sql", sql, params = ?params, "query_all");

        let rows = bind_all(sqlx::query(sql), params).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| column_value(row, i))
                    .collect::<OrmResult<Vec<_>>>()
            })
            .collect()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[DatabaseValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DatabaseValue::Null => query.bind(Option::<String>::None),
            DatabaseValue::Int64(i) => query.bind(*i),
            DatabaseValue::String(s) => query.bind(s.clone()),
            DatabaseValue::DateTime(dt) => query.bind(*dt),
        };
    }
    query
}

/// Convert a PostgreSQL column value to DatabaseValue
fn column_value(row: &PgRow, index: usize) -> OrmResult<DatabaseValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let type_name = row.columns()[index].type_info().name().to_string();
    let value = match type_name.as_str() {
        "INT2" => DatabaseValue::Int64(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => DatabaseValue::Int64(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => DatabaseValue::Int64(row.try_get::<i64, _>(index)?),
        "TIMESTAMPTZ" => DatabaseValue::DateTime(row.try_get::<DateTime<Utc>, _>(index)?),
        "TIMESTAMP" => {
            let naive: NaiveDateTime = row.try_get(index)?;
            DatabaseValue::DateTime(naive.and_utc())
        }
        _ => DatabaseValue::String(row.try_get::<String, _>(index).map_err(|e| {
            OrmError::Database(format!(
                "Failed to read column {} of type '{}' as text: {}",
                index, type_name, e
            ))
        })?),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_database_url() {
        assert!(validate_database_url("postgres://localhost/app").is_ok());
        assert!(validate_database_url("postgresql://user:pw@db:5432/app").is_ok());

        let err = validate_database_url("mysql://localhost/app").unwrap_err();
        assert!(err.is_connection());
    }
}
