use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tidemark_core::{AppConfigTrait, MigrationSettings};
use tidemark_orm::{
    AnyBackend, DatabasePoolConfig, MigrationConfig, MigrationError, MigrationManager,
    SqlDialect,
};
use tracing::{info, warn};

use crate::migrations;

pub type Manager = MigrationManager<AnyBackend>;

/// Command-line overrides applied on top of the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub table: Option<String>,
    pub positional_identity: bool,
}

pub fn resolve_settings(overrides: Overrides) -> anyhow::Result<MigrationSettings> {
    let mut settings = MigrationSettings::from_env_with_url(overrides.database_url)?;

    if let Some(table) = overrides.table {
        settings.migrations_table = table;
    }
    if overrides.positional_identity {
        settings.positional_identity = true;
    }

    settings.validate()?;
    Ok(settings)
}

/// Connect to the database and register the application's migrations
pub async fn connect(settings: &MigrationSettings) -> anyhow::Result<Manager> {
    let dialect = match settings.dialect.as_deref() {
        Some(name) => SqlDialect::from_name_or_default(Some(name)),
        None => SqlDialect::from_url(&settings.database_url)?,
    };

    let pool_config = DatabasePoolConfig {
        max_connections: settings.max_connections,
        ..DatabasePoolConfig::default()
    };

    let backend = AnyBackend::connect_as(&settings.database_url, dialect, pool_config)
        .await
        .with_context(|| format!("Could not connect to the {} database", dialect))?;

    let mut manager = MigrationManager::with_config(Arc::new(backend), MigrationConfig::from(settings));
    manager.discover(&migrations::source(), migrations::SCOPE);

    info!(
        %dialect,
        table = %settings.migrations_table,
        migrations = manager.registry().len(),
        "Migration manager ready"
    );
    Ok(manager)
}

/// Default flow: migrate, then print status
pub async fn up(manager: &Manager) -> anyhow::Result<()> {
    run(manager).await?;
    status(manager, false).await
}

pub async fn run(manager: &Manager) -> anyhow::Result<()> {
    let result = manager.migrate().await.map_err(explain)?;

    if result.applied_count == 0 {
        println!("Nothing to migrate");
    } else {
        for identity in &result.applied_migrations {
            println!("Migrated: {}", identity);
        }
        println!(
            "Applied {} migration(s) in {}ms",
            result.applied_count, result.execution_time_ms
        );
    }
    Ok(())
}

pub async fn rollback(manager: &Manager, last_only: bool) -> anyhow::Result<()> {
    let result = if last_only {
        manager.rollback_last().await
    } else {
        manager.rollback().await
    }
    .map_err(explain)?;

    if result.rolled_back_count == 0 {
        println!("Nothing to roll back");
    } else {
        for identity in &result.rolled_back_migrations {
            println!("Rolled back: {}", identity);
        }
    }
    Ok(())
}

pub async fn fresh(manager: &Manager) -> anyhow::Result<()> {
    let result = manager.fresh().await.map_err(explain)?;

    println!(
        "Rolled back {} and applied {} migration(s)",
        result.rollback.rolled_back_count, result.migrate.applied_count
    );
    Ok(())
}

pub async fn status(manager: &Manager, json: bool) -> anyhow::Result<()> {
    let report = if json {
        let report = manager.status().await.map_err(explain)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        report
    } else {
        manager.print_status().await.map_err(explain)?
    };

    let known: HashSet<&str> = report.entries.iter().map(|e| e.identity.as_str()).collect();
    for entry in manager.ledger_entries().await.map_err(explain)? {
        if !known.contains(entry.as_str()) {
            warn!(migration = %entry, "Ledger records a migration that is not registered");
        }
    }
    Ok(())
}

/// Attach a hint for unreachable databases
fn explain(err: MigrationError) -> anyhow::Error {
    if err.is_connectivity() {
        anyhow::Error::new(err).context("The database is unreachable; check DATABASE_URL")
    } else {
        anyhow::Error::new(err)
    }
}
