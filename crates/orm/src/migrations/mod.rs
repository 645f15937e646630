//! Database Migrations
//!
//! Registry, ledger and manager for reversible, ordered schema changes,
//! plus the schema builder DSL migrations are written with.

pub mod config;
pub mod definitions;
pub mod ledger;
pub mod manager;
pub mod registry;
pub mod schema_builder;
pub mod source;

pub use config::MigrationConfig;
pub use definitions::*;
pub use ledger::MigrationLedger;
pub use manager::MigrationManager;
pub use registry::MigrationRegistry;
pub use schema_builder::{ColumnDefinition, ColumnType, Schema, SchemaBuilder, TableBuilder};
pub use source::{MigrationCandidate, MigrationFactory, MigrationSource, StaticMigrationSource};
