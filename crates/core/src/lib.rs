//! # keel-core
//!
//! Storage-independent building blocks shared by the keel crates:
//! configuration loading, the core error type and sortable id generation.

pub mod config;
pub mod errors;
pub mod id;

pub use config::{AppConfig, AppConfigTrait, ConfigError, ConfigSource, Environment};
pub use errors::{CoreError, CoreResult};
pub use id::{max_id_time, min_id_time, parse_id, split_id, IdGenerator, IdParts};
