//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the `Migration` trait authors implement, the registry entry that
//! wraps each migration, identity policies for ledger keys, and the result
//! types returned by the manager.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::schema_builder::Schema;
use crate::backends::SqlDialect;
use crate::error::OrmResult;

/// A reversible unit of schema change
///
/// `up` and `down` run inside the manager's transaction through the `Schema`
/// handed to them; a migration must not open a transaction of its own.
///
/// ```rust,ignore
/// #[derive(Default)]
/// pub struct CreateArticlesTable;
///
/// #[async_trait]
/// impl Migration for CreateArticlesTable {
///     fn name(&self) -> &str {
///         "2024_01_15_000001_create_articles_table"
///     }
///
///     async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
///         schema
///             .create_table("articles", |table| {
///                 table.id();
///                 table.string("title").not_null();
///                 table.timestamps();
///             })
///             .await
///     }
///
///     async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
///         schema.drop_table("articles").await
///     }
/// }
/// ```
#[async_trait]
pub trait Migration: Send + Sync {
    /// Stable identity of the migration
    ///
    /// Defaults to the simple type name. Prefer overriding it with a sortable,
    /// timestamped name so the identity never depends on registration order.
    ///
    /// The name only keys the ledger. Execution order comes from the registry:
    /// call order for `add`, simple type name within a discovered batch.
    fn name(&self) -> &str {
        simple_type_name(std::any::type_name::<Self>())
    }

    /// Apply the forward schema change
    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()>;

    /// Undo everything `up` did
    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()>;
}

/// Last path segment of a type name, without generic arguments
pub fn simple_type_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Where a registry entry came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOrigin {
    /// Registered through `add`
    Explicit,
    /// Produced by a migration source for the given scope
    Discovered { scope: String },
}

/// A migration as held by the registry, tagged with the ambient dialect
pub struct RegisteredMigration {
    migration: Box<dyn Migration>,
    type_name: String,
    dialect: SqlDialect,
    origin: MigrationOrigin,
}

impl RegisteredMigration {
    pub fn new(
        migration: Box<dyn Migration>,
        type_name: impl Into<String>,
        dialect: SqlDialect,
        origin: MigrationOrigin,
    ) -> Self {
        Self {
            migration,
            type_name: type_name.into(),
            dialect,
            origin,
        }
    }

    pub fn migration(&self) -> &dyn Migration {
        self.migration.as_ref()
    }

    /// The migration's intrinsic name
    pub fn name(&self) -> &str {
        self.migration.name()
    }

    /// Full type name as reported at registration
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Sort key used among discovered migrations
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.type_name)
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn origin(&self) -> &MigrationOrigin {
        &self.origin
    }
}

impl fmt::Debug for RegisteredMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredMigration")
            .field("name", &self.name())
            .field("type_name", &self.type_name)
            .field("dialect", &self.dialect)
            .field("origin", &self.origin)
            .finish()
    }
}

/// How a registry entry maps to its ledger key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Ledger key is `Migration::name`
    #[default]
    Intrinsic,
    /// Ledger key is `migration_<1-based position>` in registry order.
    /// Inserting a migration before existing ones shifts every later key.
    Positional,
}

impl IdentityPolicy {
    /// Ledger key for the entry at `index` (0-based) in registry order
    pub fn identity(&self, entry: &RegisteredMigration, index: usize) -> String {
        match self {
            IdentityPolicy::Intrinsic => entry.name().to_string(),
            IdentityPolicy::Positional => format!("migration_{}", index + 1),
        }
    }
}

impl std::str::FromStr for IdentityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intrinsic" | "name" => Ok(IdentityPolicy::Intrinsic),
            "positional" | "index" => Ok(IdentityPolicy::Positional),
            _ => Err(format!("Unknown identity policy: {}", s)),
        }
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run `up`)
    Up,
    /// Rollback the migration (run `down`)
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Result of running migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// Identities of migrations that were applied, in order
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Result of rolling back migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// Identities of migrations that were rolled back, in order
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Result of a full rollback followed by a full migrate
#[derive(Debug, Clone, Default, Serialize)]
pub struct FreshResult {
    pub rollback: RollbackResult,
    pub migrate: MigrationRunResult,
}

/// Migration status in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied and not reverted since
    Executed,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Executed => write!(f, "✓ Executed"),
            MigrationStatus::Pending => write!(f, "✗ Pending"),
        }
    }
}

/// Status of a single registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatusEntry {
    pub identity: String,
    pub type_name: String,
    pub status: MigrationStatus,
}

/// Status of every registry entry, in forward order
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStatusReport {
    pub entries: Vec<MigrationStatusEntry>,
}

impl MigrationStatusReport {
    pub fn executed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == MigrationStatus::Executed)
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len() - self.executed_count()
    }

    /// Check if all migrations are applied
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count() == 0
    }

    /// Status of the entry with the given identity
    pub fn status_of(&self, identity: &str) -> Option<MigrationStatus> {
        self.entries
            .iter()
            .find(|e| e.identity == identity)
            .map(|e| e.status)
    }
}

impl fmt::Display for MigrationStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "=== Migration Status ===")?;
        for entry in &self.entries {
            writeln!(f, "{} - {}", entry.identity, entry.status)?;
        }
        writeln!(f, "========================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CreateUsersTable;

    #[async_trait]
    impl Migration for CreateUsersTable {
        async fn up(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
            Ok(())
        }

        async fn down(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("app::migrations::CreateUsers"), "CreateUsers");
        assert_eq!(simple_type_name("CreateUsers"), "CreateUsers");
        assert_eq!(simple_type_name("app::Wrapper<app::Inner>"), "Wrapper");
    }

    #[test]
    fn test_default_name_is_simple_type_name() {
        let migration: Box<dyn Migration> = Box::new(CreateUsersTable);
        assert_eq!(migration.name(), "CreateUsersTable");
    }

    #[test]
    fn test_identity_policies() {
        let entry = RegisteredMigration::new(
            Box::new(CreateUsersTable),
            std::any::type_name::<CreateUsersTable>(),
            SqlDialect::SQLite,
            MigrationOrigin::Explicit,
        );

        assert_eq!(IdentityPolicy::Intrinsic.identity(&entry, 4), "CreateUsersTable");
        assert_eq!(IdentityPolicy::Positional.identity(&entry, 0), "migration_1");
        assert_eq!(IdentityPolicy::Positional.identity(&entry, 4), "migration_5");
        assert_eq!("positional".parse::<IdentityPolicy>(), Ok(IdentityPolicy::Positional));
        assert!("random".parse::<IdentityPolicy>().is_err());
    }

    #[test]
    fn test_status_report_format() {
        let report = MigrationStatusReport {
            entries: vec![
                MigrationStatusEntry {
                    identity: "migration_1".to_string(),
                    type_name: "CreateUsersTable".to_string(),
                    status: MigrationStatus::Executed,
                },
                MigrationStatusEntry {
                    identity: "migration_2".to_string(),
                    type_name: "CreateArticlesTable".to_string(),
                    status: MigrationStatus::Pending,
                },
            ],
        };

        assert_eq!(
            report.to_string(),
            "\n=== Migration Status ===\n\
             migration_1 - ✓ Executed\n\
             migration_2 - ✗ Pending\n\
             ========================\n"
        );
        assert_eq!(report.executed_count(), 1);
        assert_eq!(report.pending_count(), 1);
        assert!(!report.is_up_to_date());
        assert_eq!(report.status_of("migration_2"), Some(MigrationStatus::Pending));
        assert_eq!(report.status_of("migration_3"), None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["status"], "executed");
        assert_eq!(json["entries"][1]["identity"], "migration_2");
    }
}
