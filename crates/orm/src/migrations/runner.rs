//! Migration Runner - Executes migrations against the database
//!
//! Walks the sorted registry relative to the ledger's last applied id. Runs are
//! strictly sequential: each operation is awaited before the ledger is touched,
//! and the first failing operation ends the run. No lock is taken around the
//! read-then-write sequence, so two runners against the same ledger can race.

use std::collections::HashMap;
use std::sync::Arc;

use super::definitions::{
    MigrationConfig, MigrationDirection, MigrationRunResult, MigrationState, MigrationStatus,
    RollbackResult,
};
use super::ledger::MigrationLedger;
use super::registry::MigrationRegistry;
use super::reporter::{ConsoleReporter, MigrationReporter};
use crate::database::Database;
use crate::error::{OrmError, OrmResult};

/// Migration runner that applies a registry against a ledger
pub struct MigrationRunner {
    registry: MigrationRegistry,
    ledger: MigrationLedger,
    db: Arc<dyn Database>,
    reporter: Box<dyn MigrationReporter>,
}

impl MigrationRunner {
    /// Create a runner reporting to the console
    pub fn new(
        registry: MigrationRegistry,
        db: Arc<dyn Database>,
        config: &MigrationConfig,
    ) -> OrmResult<Self> {
        let ledger = MigrationLedger::new(Arc::clone(&db), config)?;
        Ok(Self {
            registry,
            ledger,
            db,
            reporter: Box::new(ConsoleReporter),
        })
    }

    /// Replace the reporting sink
    pub fn with_reporter(mut self, reporter: impl MigrationReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Get the registry
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Get the ledger
    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Index of the last applied migration in the sorted registry.
    ///
    /// Anchors on ordering rather than exact match: the position is the
    /// greatest registered id not after the ledger's last id. `None` means
    /// nothing is applied.
    pub async fn current_index(&self) -> OrmResult<Option<usize>> {
        let last = match self.ledger.last_applied_id().await? {
            Some(id) => id,
            None => return Ok(None),
        };

        if !self.registry.contains(&last) {
            tracing::warn!(
                ledger_id = %last,
                table = self.ledger.table(),
                "last applied migration is not registered; position derived from ordering"
            );
        }

        let sorted = self.registry.sorted();
        Ok(sorted.iter().rposition(|m| m.id.as_str() <= last.as_str()))
    }

    /// Apply pending migrations in ascending order.
    ///
    /// `None` or `Some(0)` applies everything pending; `Some(n)` applies at most
    /// `n`. A failing up operation is reported and returned in
    /// [`MigrationRunResult::failure`]; migrations applied before it stay
    /// recorded and nothing after it is attempted. Storage errors while reading
    /// or writing the ledger are returned as `Err`.
    pub async fn run_up(&self, limit: Option<usize>) -> OrmResult<MigrationRunResult> {
        let current = self.current_index().await?;
        let mut result = MigrationRunResult::default();

        if self.registry.is_empty() {
            self.reporter.no_migrations_registered();
            return Ok(result);
        }

        let sorted = self.registry.sorted();
        let start = current.map_or(0, |index| index + 1);
        let target = match limit {
            Some(n) if n > 0 => sorted.len().min(start + n),
            _ => sorted.len(),
        };

        if start >= target {
            self.reporter.nothing_to_do();
            return Ok(result);
        }

        for migration in &sorted[start..target] {
            tracing::debug!(migration = %migration.id, "running up");

            let up = migration.operation(MigrationDirection::Up);
            if let Err(e) = up.apply(self.db.as_ref()).await {
                let failure = OrmError::migration(&migration.id, MigrationDirection::Up, e);
                self.reporter.failed(&migration.id, MigrationDirection::Up, &failure);
                result.failure = Some(failure);
                return Ok(result);
            }

            self.ledger.record(&migration.id).await?;
            self.reporter.applied(&migration.id);
            result.applied_migrations.push(migration.id.clone());
        }

        Ok(result)
    }

    /// Revert the most recently applied migration.
    ///
    /// Only `n == 1` is supported; anything else is rejected before storage is
    /// touched. A failing down operation leaves the migration recorded.
    pub async fn run_down(&self, n: usize) -> OrmResult<RollbackResult> {
        if n != 1 {
            return Err(OrmError::InvalidArgument(format!(
                "run_down only supports reverting 1 migration at a time, got {}",
                n
            )));
        }

        let current = self.current_index().await?;
        let mut result = RollbackResult::default();

        if self.registry.is_empty() {
            self.reporter.no_migrations_registered();
            return Ok(result);
        }

        let index = match current {
            Some(index) => index,
            None => {
                self.reporter.nothing_to_do();
                return Ok(result);
            }
        };

        let sorted = self.registry.sorted();
        let migration = sorted[index];
        tracing::debug!(migration = %migration.id, "running down");

        let down = migration.operation(MigrationDirection::Down);
        if let Err(e) = down.apply(self.db.as_ref()).await {
            let failure = OrmError::migration(&migration.id, MigrationDirection::Down, e);
            self.reporter.failed(&migration.id, MigrationDirection::Down, &failure);
            result.failure = Some(failure);
            return Ok(result);
        }

        self.ledger.remove(&migration.id).await?;
        self.reporter.reverted(&migration.id);
        result.rolled_back = Some(migration.id.clone());
        Ok(result)
    }

    /// Every registered migration, ascending, with its ledger state
    pub async fn status(&self) -> OrmResult<Vec<MigrationStatus>> {
        let applied: HashMap<String, _> = self
            .ledger
            .applied()
            .await?
            .into_iter()
            .map(|record| (record.id, record.created))
            .collect();

        Ok(self
            .registry
            .sorted()
            .into_iter()
            .map(|migration| MigrationStatus {
                id: migration.id.clone(),
                state: match applied.get(&migration.id) {
                    Some(created) => MigrationState::Applied { created: *created },
                    None => MigrationState::Pending,
                },
            })
            .collect())
    }
}
