//! Migration ledger
//!
//! The tracking table that records which migrations are applied. A row for
//! identity X exists exactly when X has been applied and not reverted since.
//! All operations run on the executor they are given, so they join whatever
//! transaction the caller opened.

use tracing::debug;

use crate::backends::{DatabaseExecutor, DatabaseValue, SqlDialect};
use crate::error::OrmResult;

/// Persistent record of applied migrations
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    dialect: SqlDialect,
    table_name: String,
}

impl MigrationLedger {
    /// Ledger stored in the `migrations` table
    pub fn new(dialect: SqlDialect) -> Self {
        Self::with_table(dialect, "migrations")
    }

    pub fn with_table(dialect: SqlDialect, table_name: impl Into<String>) -> Self {
        Self {
            dialect,
            table_name: table_name.into(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id {}, \
             migration VARCHAR(255) NOT NULL, \
             executed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
             )",
            self.table_name,
            self.dialect.id_column()
        )
    }

    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE migration = {}",
            self.table_name,
            self.dialect.parameter_placeholder(0)
        )
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (migration) VALUES ({})",
            self.table_name,
            self.dialect.parameter_placeholder(0)
        )
    }

    pub fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE migration = {}",
            self.table_name,
            self.dialect.parameter_placeholder(0)
        )
    }

    pub fn list_sql(&self) -> String {
        format!("SELECT migration FROM {} ORDER BY id", self.table_name)
    }

    /// Create the tracking table if it does not exist yet
    pub async fn ensure_table(&self, executor: &mut dyn DatabaseExecutor) -> OrmResult<()> {
        executor.exec(&self.create_table_sql(), &[]).await?;
        Ok(())
    }

    /// Whether a row exists for `name`
    ///
    /// A missing, NULL or non-numeric count is treated as "not recorded".
    pub async fn is_recorded(
        &self,
        executor: &mut dyn DatabaseExecutor,
        name: &str,
    ) -> OrmResult<bool> {
        let cell = executor
            .first_cell(&self.count_sql(), &[DatabaseValue::from(name)])
            .await?;

        match cell.as_ref().and_then(DatabaseValue::as_i64) {
            Some(count) => Ok(count > 0),
            None => {
                debug!(
                    migration = %name,
                    value = ?cell,
                    "Ledger count query returned no usable value, treating as not recorded"
                );
                Ok(false)
            }
        }
    }

    /// Insert a row for `name`
    pub async fn record(&self, executor: &mut dyn DatabaseExecutor, name: &str) -> OrmResult<()> {
        executor
            .exec(&self.insert_sql(), &[DatabaseValue::from(name)])
            .await?;
        Ok(())
    }

    /// Delete every row for `name`, returning how many were removed
    pub async fn unrecord(&self, executor: &mut dyn DatabaseExecutor, name: &str) -> OrmResult<u64> {
        executor
            .exec(&self.delete_sql(), &[DatabaseValue::from(name)])
            .await
    }

    /// Every recorded identity in insertion order
    pub async fn recorded(&self, executor: &mut dyn DatabaseExecutor) -> OrmResult<Vec<String>> {
        let values = executor.first_column(&self.list_sql(), &[]).await?;

        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                DatabaseValue::String(name) => Some(name),
                _ => None,
            })
            .collect())
    }
}
