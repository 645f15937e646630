//! # tidemark-orm: schema migrations for PostgreSQL, MySQL and SQLite
//!
//! Register ordered, reversible migrations, apply the ones not yet recorded,
//! and roll back all of history or only the most recent step. Execution
//! state lives in a tracking table inside the target database.
//!
//! ```rust,ignore
//! let backend = Arc::new(AnyBackend::connect("sqlite::memory:", DatabasePoolConfig::default()).await?);
//! let mut manager = MigrationManager::new(backend);
//! manager.add(CreateUsersTable).add(CreateArticlesTable);
//!
//! manager.migrate().await?;
//! manager.print_status().await?;
//! ```

pub mod backends;
pub mod error;
pub mod migrations;

// Re-export core traits and types
pub use backends::{
    AnyBackend, DatabaseExecutor, DatabasePoolConfig, DatabaseValue, SqlDialect,
    TransactionalExecutor, UnitOfWork,
};
pub use error::{MigrationError, OrmError, OrmResult};
pub use migrations::{
    FreshResult, IdentityPolicy, Migration, MigrationConfig, MigrationDirection,
    MigrationLedger, MigrationManager, MigrationOrigin, MigrationRegistry, MigrationRunResult,
    MigrationSource, MigrationStatus, MigrationStatusReport, RollbackResult, Schema,
    SchemaBuilder, StaticMigrationSource, TableBuilder,
};

// Authors implement `Migration` with `#[async_trait]`
pub use async_trait::async_trait;
