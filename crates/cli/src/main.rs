mod commands;
mod migrations;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use commands::migrate::{self, Overrides};
use tidemark_core::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(about = "Apply, revert and inspect database schema migrations")]
#[command(version)]
struct Cli {
    /// Database URL (defaults to DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Ledger table name (defaults to MIGRATIONS_TABLE or "migrations")
    #[arg(long, global = true)]
    table: Option<String>,

    /// Key the ledger by position (`migration_<n>`) instead of migration names
    #[arg(long, global = true)]
    positional_identity: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pending migrations and print status (default)
    Up,

    /// Run pending migrations
    Migrate,

    /// Revert applied migrations
    Rollback {
        /// Only revert the most recently applied migration
        #[arg(long)]
        last: bool,
    },

    /// Revert everything, then migrate from scratch
    Fresh,

    /// Show which migrations are applied
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = migrate::resolve_settings(Overrides {
        database_url: cli.database_url,
        table: cli.table,
        positional_identity: cli.positional_identity,
    })?;

    init_logging(LoggingConfig::from(&settings).with_json(cli.json_logs))
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let manager = migrate::connect(&settings).await?;

    match cli.command.unwrap_or(Commands::Up) {
        Commands::Up => migrate::up(&manager).await?,
        Commands::Migrate => migrate::run(&manager).await?,
        Commands::Rollback { last } => migrate::rollback(&manager, last).await?,
        Commands::Fresh => migrate::fresh(&manager).await?,
        Commands::Status { json } => migrate::status(&manager, json).await?,
    }

    Ok(())
}
