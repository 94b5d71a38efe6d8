//! Migration Registry - in-memory collection of migration definitions
//!
//! Migrations run in ascending order of their identifiers under plain string
//! comparison. Identifiers must therefore encode time in a zero-padded form,
//! such as the `YYYYMMDDHHMMSS` prefix produced by `keel migrate create`, so
//! that string order is the intended chronological order.

use std::collections::HashSet;
use std::sync::Arc;

use super::definitions::{Migration, MigrationOperation, SqlOperation};
use crate::error::{OrmError, OrmResult};

/// Ordered set of migrations known to one application instance
#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
    ids: HashSet<String>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration.
    ///
    /// Fails with [`OrmError::Configuration`] when the identifier is malformed
    /// or already registered.
    pub fn add<U, D>(&mut self, id: impl Into<String>, up: U, down: D) -> OrmResult<()>
    where
        U: MigrationOperation + 'static,
        D: MigrationOperation + 'static,
    {
        let id = id.into();
        validate_migration_id(&id)?;

        if self.ids.contains(&id) {
            return Err(OrmError::Configuration(format!(
                "Migration '{}' is already registered",
                id
            )));
        }

        self.ids.insert(id.clone());
        self.migrations.push(Migration {
            id,
            up: Arc::new(up),
            down: Arc::new(down),
        });
        Ok(())
    }

    /// Register a migration whose operations are plain SQL bodies
    pub fn add_sql(
        &mut self,
        id: impl Into<String>,
        up_sql: impl Into<String>,
        down_sql: impl Into<String>,
    ) -> OrmResult<()> {
        self.add(id, SqlOperation::new(up_sql), SqlOperation::new(down_sql))
    }

    /// Migrations sorted ascending by identifier
    pub fn sorted(&self) -> Vec<&Migration> {
        let mut sorted: Vec<&Migration> = self.migrations.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        sorted
    }

    /// Identifiers sorted ascending
    pub fn ids(&self) -> Vec<&str> {
        self.sorted().into_iter().map(|m| m.id.as_str()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// Check that a migration identifier is non-empty and made of
/// ASCII letters, digits, `_`, `-` or `.`
pub fn validate_migration_id(id: &str) -> OrmResult<()> {
    if id.is_empty() {
        return Err(OrmError::Configuration(
            "Migration identifier must not be empty".to_string(),
        ));
    }

    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(OrmError::Configuration(format!(
            "Migration identifier '{}' contains invalid character {:?}",
            id, bad
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_string_order_not_registration_order() {
        let mut registry = MigrationRegistry::new();
        registry.add_sql("20240301000000_c", "", "").unwrap();
        registry.add_sql("20240101000000_a", "", "").unwrap();
        registry.add_sql("20240201000000_b", "", "").unwrap();

        assert_eq!(
            registry.ids(),
            vec!["20240101000000_a", "20240201000000_b", "20240301000000_c"]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_string_order_is_not_numeric_order() {
        let mut registry = MigrationRegistry::new();
        registry.add_sql("10", "", "").unwrap();
        registry.add_sql("9", "", "").unwrap();

        assert_eq!(registry.ids(), vec!["10", "9"]);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut registry = MigrationRegistry::new();
        registry.add_sql("0001_users", "CREATE TABLE users ()", "DROP TABLE users").unwrap();

        let err = registry.add_sql("0001_users", "SELECT 1", "SELECT 2").unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        let mut registry = MigrationRegistry::new();
        assert!(registry.add_sql("", "", "").is_err());
        assert!(registry.add_sql("2024 users", "", "").is_err());
        assert!(registry.add_sql("2024/users", "", "").is_err());
        assert!(registry.is_empty());

        assert!(registry.add_sql("20240101000000_create-users.v2", "", "").is_ok());
    }

    #[test]
    fn test_get_and_contains() {
        let mut registry = MigrationRegistry::new();
        registry.add_sql("0001", "SELECT 1", "SELECT 2").unwrap();

        assert!(registry.contains("0001"));
        assert_eq!(registry.get("0001").map(|m| m.id.as_str()), Some("0001"));
        assert!(registry.get("0002").is_none());
    }
}
