//! # tidemark-core
//!
//! Environment-driven configuration and logging setup shared by the
//! tidemark migration engine and its command-line front end.

pub mod config;
pub mod logging;

pub use config::{AppConfigTrait, ConfigError, ConfigSource, Environment, MigrationSettings};
pub use logging::{init_logging, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
