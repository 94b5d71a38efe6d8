//! Migration System
//!
//! Registry of ordered schema changes, the ledger recording which of them
//! have been applied, and the runner moving the ledger forward or back.

pub mod definitions;
pub mod files;
pub mod ledger;
pub mod registry;
pub mod reporter;
pub mod runner;

pub use definitions::*;
pub use files::{create_migration, load_migrations, read_migrations, to_snake_case, MigrationSource};
pub use ledger::MigrationLedger;
pub use registry::{validate_migration_id, MigrationRegistry};
pub use reporter::{ConsoleReporter, MigrationReporter, SilentReporter};
pub use runner::MigrationRunner;
