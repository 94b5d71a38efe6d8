//! Database Backend Implementations
//!
//! Concrete [`Database`](crate::database::Database) collaborators.

pub mod postgres;

pub use postgres::{PostgresDatabase, PostgresPoolConfig};
