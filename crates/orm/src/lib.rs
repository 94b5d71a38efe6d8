//! # keel-orm: Database Layer for keel
//!
//! The schema migration engine and the database collaborator it runs against.
//! Migrations are registered into a [`MigrationRegistry`], applied by a
//! [`MigrationRunner`] and tracked in a [`MigrationLedger`] table.

pub mod backends;
pub mod database;
pub mod error;
pub mod migrations;

pub use backends::{PostgresDatabase, PostgresPoolConfig};
pub use database::{Database, DatabaseValue};
pub use error::{OrmError, OrmResult};
pub use migrations::*;
