//! Operator-facing progress reporting for migration runs

use super::definitions::MigrationDirection;
use crate::error::OrmError;

/// Sink for the events of a migration run
pub trait MigrationReporter: Send + Sync {
    /// The registry is empty
    fn no_migrations_registered(&self);

    /// There is nothing to apply or revert
    fn nothing_to_do(&self);

    /// A migration's up operation succeeded and was recorded
    fn applied(&self, id: &str);

    /// A migration's down operation succeeded and its ledger row was removed
    fn reverted(&self, id: &str);

    /// A migration operation failed; the run stops here
    fn failed(&self, id: &str, direction: MigrationDirection, error: &OrmError);
}

/// Prints progress to stdout and mirrors it to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl MigrationReporter for ConsoleReporter {
    fn no_migrations_registered(&self) {
        tracing::info!("0 migrations registered");
        println!("\nThere are 0 migrations registered. Nothing to do\n");
    }

    fn nothing_to_do(&self) {
        tracing::info!("no pending migrations");
        println!("\nNothing to do\n");
    }

    fn applied(&self, id: &str) {
        tracing::info!(migration = id, "applied migration");
        println!("Ran up for '{}'", id);
    }

    fn reverted(&self, id: &str) {
        tracing::info!(migration = id, "reverted migration");
        println!("Ran down for '{}'", id);
    }

    fn failed(&self, id: &str, direction: MigrationDirection, error: &OrmError) {
        tracing::error!(migration = id, %direction, error = %error, "migration failed");
        println!("Error running {} for migration '{}'\n\n{}\n", direction, id, error);
    }
}

/// Only emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl MigrationReporter for SilentReporter {
    fn no_migrations_registered(&self) {
        tracing::debug!("0 migrations registered");
    }

    fn nothing_to_do(&self) {
        tracing::debug!("no pending migrations");
    }

    fn applied(&self, id: &str) {
        tracing::info!(migration = id, "applied migration");
    }

    fn reverted(&self, id: &str) {
        tracing::info!(migration = id, "reverted migration");
    }

    fn failed(&self, id: &str, direction: MigrationDirection, error: &OrmError) {
        tracing::error!(migration = id, %direction, error = %error, "migration failed");
    }
}
