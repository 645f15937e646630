//! Migration Manager - Applies, reverts and reports migrations
//!
//! Ties the registry, the ledger and a transactional executor together.
//! `migrate`, `rollback` and `rollback_last` each run in exactly one
//! transaction: either every step of the invocation lands or none does.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::config::MigrationConfig;
use super::definitions::{
    FreshResult, IdentityPolicy, Migration, MigrationDirection, MigrationRunResult,
    MigrationStatus, MigrationStatusEntry, MigrationStatusReport, RegisteredMigration,
    RollbackResult,
};
use super::ledger::MigrationLedger;
use super::registry::MigrationRegistry;
use super::schema_builder::Schema;
use super::source::MigrationSource;
use crate::backends::{DatabaseExecutor, SqlDialect, TransactionalExecutor, UnitOfWork};
use crate::error::{MigrationError, OrmError};

/// Migration manager over an injected transactional executor
pub struct MigrationManager<E: TransactionalExecutor> {
    executor: Arc<E>,
    registry: MigrationRegistry,
    ledger: MigrationLedger,
    config: MigrationConfig,
}

impl<E: TransactionalExecutor> MigrationManager<E> {
    /// Create a new migration manager with default configuration
    pub fn new(executor: Arc<E>) -> Self {
        Self::with_config(executor, MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(executor: Arc<E>, config: MigrationConfig) -> Self {
        let ledger = MigrationLedger::with_table(executor.dialect(), config.table_name.clone());
        Self::with_ledger(executor, config, ledger)
    }

    /// Create a migration manager around an existing ledger
    ///
    /// The ledger's table name takes precedence over `config.table_name`.
    pub fn with_ledger(executor: Arc<E>, config: MigrationConfig, ledger: MigrationLedger) -> Self {
        let config = config.with_table(ledger.table_name());
        Self {
            registry: MigrationRegistry::new(executor.dialect()),
            ledger,
            executor,
            config,
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.registry.dialect()
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Register a migration after everything registered so far
    pub fn add<M>(&mut self, migration: M) -> &mut Self
    where
        M: Migration + 'static,
    {
        self.registry.add(migration);
        self
    }

    /// Register every migration `source` finds under `scope`
    pub fn discover(&mut self, source: &dyn MigrationSource, scope: &str) -> &mut Self {
        self.registry.discover(source, scope);
        self
    }

    /// Apply every pending migration in registry order
    pub async fn migrate(&self) -> Result<MigrationRunResult, MigrationError> {
        self.registry.validate(self.config.identity_policy)?;
        let start = Instant::now();

        let mut work = MigrateWork {
            registry: &self.registry,
            ledger: &self.ledger,
            policy: self.config.identity_policy,
        };
        let work: &mut dyn UnitOfWork<MigrationRunResult, MigrationError> = &mut work;
        let mut result = self.executor.with_transaction(work).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(result)
    }

    /// Revert every applied migration in reverse registry order
    pub async fn rollback(&self) -> Result<RollbackResult, MigrationError> {
        self.revert(false).await
    }

    /// Revert only the most recently registered applied migration
    pub async fn rollback_last(&self) -> Result<RollbackResult, MigrationError> {
        self.revert(true).await
    }

    async fn revert(&self, last_only: bool) -> Result<RollbackResult, MigrationError> {
        self.registry.validate(self.config.identity_policy)?;
        let start = Instant::now();

        let mut work = RollbackWork {
            registry: &self.registry,
            ledger: &self.ledger,
            policy: self.config.identity_policy,
            last_only,
        };
        let work: &mut dyn UnitOfWork<RollbackResult, MigrationError> = &mut work;
        let mut result = self.executor.with_transaction(work).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(result)
    }

    /// Roll everything back, then migrate from scratch
    ///
    /// Runs as two transactions. If `migrate` fails after `rollback`
    /// committed, the database is left fully rolled back.
    pub async fn fresh(&self) -> Result<FreshResult, MigrationError> {
        let rollback = self.rollback().await?;
        let migrate = self.migrate().await?;
        Ok(FreshResult { rollback, migrate })
    }

    /// Applied/pending state of every registered migration
    ///
    /// Still reports when identities collide; every colliding entry shows the
    /// state of the shared ledger row.
    pub async fn status(&self) -> Result<MigrationStatusReport, MigrationError> {
        for identity in self.registry.duplicate_identities(self.config.identity_policy) {
            error!(
                migration = %identity,
                "Duplicate migration identity, migrate and rollback will refuse to run"
            );
        }

        let mut work = StatusWork {
            registry: &self.registry,
            ledger: &self.ledger,
            policy: self.config.identity_policy,
        };
        let work: &mut dyn UnitOfWork<MigrationStatusReport, MigrationError> = &mut work;
        self.executor.with_connection(work).await
    }

    /// Print the status report to stdout
    pub async fn print_status(&self) -> Result<MigrationStatusReport, MigrationError> {
        let report = self.status().await?;
        println!("{}", report);
        Ok(report)
    }

    /// Identities currently in the ledger, in insertion order
    pub async fn ledger_entries(&self) -> Result<Vec<String>, MigrationError> {
        let mut work = LedgerEntriesWork {
            ledger: &self.ledger,
        };
        let work: &mut dyn UnitOfWork<Vec<String>, MigrationError> = &mut work;
        self.executor.with_connection(work).await
    }
}

/// Create the ledger table, logging the abort on failure
async fn ensure_ledger(
    ledger: &MigrationLedger,
    executor: &mut dyn DatabaseExecutor,
) -> Result<(), MigrationError> {
    ledger.ensure_table(executor).await.map_err(|source| {
        error!(table = %ledger.table_name(), error = %source, "Failed to prepare migration ledger");
        MigrationError::Database(source)
    })
}

/// Attach the migration identity to a failed ledger read or write
fn ledger_failure(identity: &str, source: OrmError) -> MigrationError {
    error!(migration = %identity, error = %source, "Migration ledger update failed");
    MigrationError::Ledger {
        identity: identity.to_string(),
        source,
    }
}

/// Run one direction of a migration on the shared executor
async fn run_migration(
    entry: &RegisteredMigration,
    identity: &str,
    direction: MigrationDirection,
    executor: &mut dyn DatabaseExecutor,
) -> Result<(), MigrationError> {
    let mut schema = Schema::new(executor);
    let outcome = match direction {
        MigrationDirection::Up => entry.migration().up(&mut schema).await,
        MigrationDirection::Down => entry.migration().down(&mut schema).await,
    };

    outcome.map_err(|source| {
        error!(
            migration = %identity,
            %direction,
            error = %source,
            "Migration failed"
        );
        MigrationError::Execution {
            identity: identity.to_string(),
            direction,
            source,
        }
    })
}

struct MigrateWork<'a> {
    registry: &'a MigrationRegistry,
    ledger: &'a MigrationLedger,
    policy: IdentityPolicy,
}

#[async_trait]
impl<'a> UnitOfWork<MigrationRunResult, MigrationError> for MigrateWork<'a> {
    async fn run(
        &mut self,
        executor: &mut dyn DatabaseExecutor,
    ) -> Result<MigrationRunResult, MigrationError> {
        ensure_ledger(self.ledger, executor).await?;

        let mut result = MigrationRunResult::default();
        for (index, entry) in self.registry.iter().enumerate() {
            let identity = self.policy.identity(entry, index);

            let recorded = self
                .ledger
                .is_recorded(executor, &identity)
                .await
                .map_err(|e| ledger_failure(&identity, e))?;

            if recorded {
                debug!(migration = %identity, "Migration already executed, skipping");
                result.skipped_count += 1;
                continue;
            }

            info!(migration = %identity, "Running migration");
            run_migration(entry, &identity, MigrationDirection::Up, executor).await?;
            self.ledger
                .record(executor, &identity)
                .await
                .map_err(|e| ledger_failure(&identity, e))?;
            info!(migration = %identity, "Migration completed");

            result.applied_count += 1;
            result.applied_migrations.push(identity);
        }

        if result.applied_count == 0 {
            info!("Nothing to migrate, all migrations are up to date");
        } else {
            info!(count = result.applied_count, "All migrations are up to date");
        }

        Ok(result)
    }
}

struct RollbackWork<'a> {
    registry: &'a MigrationRegistry,
    ledger: &'a MigrationLedger,
    policy: IdentityPolicy,
    last_only: bool,
}

#[async_trait]
impl<'a> UnitOfWork<RollbackResult, MigrationError> for RollbackWork<'a> {
    async fn run(
        &mut self,
        executor: &mut dyn DatabaseExecutor,
    ) -> Result<RollbackResult, MigrationError> {
        ensure_ledger(self.ledger, executor).await?;

        let mut result = RollbackResult::default();
        for (index, entry) in self.registry.iter().enumerate().rev() {
            let identity = self.policy.identity(entry, index);

            let recorded = self
                .ledger
                .is_recorded(executor, &identity)
                .await
                .map_err(|e| ledger_failure(&identity, e))?;

            if !recorded {
                debug!(migration = %identity, "Migration not executed, nothing to roll back");
                continue;
            }

            info!(migration = %identity, "Rolling back migration");
            run_migration(entry, &identity, MigrationDirection::Down, executor).await?;
            self.ledger
                .unrecord(executor, &identity)
                .await
                .map_err(|e| ledger_failure(&identity, e))?;
            info!(migration = %identity, "Migration rolled back");

            result.rolled_back_count += 1;
            result.rolled_back_migrations.push(identity);

            if self.last_only {
                break;
            }
        }

        if result.rolled_back_count == 0 {
            info!("No executed migrations to roll back");
        }

        Ok(result)
    }
}

struct StatusWork<'a> {
    registry: &'a MigrationRegistry,
    ledger: &'a MigrationLedger,
    policy: IdentityPolicy,
}

#[async_trait]
impl<'a> UnitOfWork<MigrationStatusReport, MigrationError> for StatusWork<'a> {
    async fn run(
        &mut self,
        executor: &mut dyn DatabaseExecutor,
    ) -> Result<MigrationStatusReport, MigrationError> {
        ensure_ledger(self.ledger, executor).await?;

        let mut report = MigrationStatusReport::default();
        for (index, entry) in self.registry.iter().enumerate() {
            let identity = self.policy.identity(entry, index);
            let recorded = self
                .ledger
                .is_recorded(executor, &identity)
                .await
                .map_err(|e| ledger_failure(&identity, e))?;
            let status = if recorded {
                MigrationStatus::Executed
            } else {
                MigrationStatus::Pending
            };

            report.entries.push(MigrationStatusEntry {
                identity,
                type_name: entry.type_name().to_string(),
                status,
            });
        }

        Ok(report)
    }
}

struct LedgerEntriesWork<'a> {
    ledger: &'a MigrationLedger,
}

#[async_trait]
impl<'a> UnitOfWork<Vec<String>, MigrationError> for LedgerEntriesWork<'a> {
    async fn run(
        &mut self,
        executor: &mut dyn DatabaseExecutor,
    ) -> Result<Vec<String>, MigrationError> {
        ensure_ledger(self.ledger, executor).await?;
        Ok(self.ledger.recorded(executor).await?)
    }
}
