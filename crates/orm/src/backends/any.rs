//! sqlx `Any` Backend Implementation
//!
//! Runs the engine's executor primitives against PostgreSQL, MySQL or SQLite
//! through sqlx's runtime-selected `Any` driver.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, AnyPool, Row};
use tracing::{debug, warn};

use super::core::*;
use crate::error::{OrmError, OrmResult};

/// Database backend over a sqlx `Any` pool
#[derive(Debug, Clone)]
pub struct AnyBackend {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl AnyBackend {
    /// Connect a pool for `database_url`, detecting the dialect from its scheme
    pub async fn connect(database_url: &str, config: DatabasePoolConfig) -> OrmResult<Self> {
        let dialect = SqlDialect::from_url(database_url)?;
        Self::connect_as(database_url, dialect, config).await
    }

    /// Connect a pool for `database_url`, generating SQL for `dialect`
    pub async fn connect_as(
        database_url: &str,
        dialect: SqlDialect,
        config: DatabasePoolConfig,
    ) -> OrmResult<Self> {
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

        if dialect == SqlDialect::SQLite && database_url.contains(":memory:") {
            // Each connection to an in-memory database sees its own empty database.
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
                .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs));
        }

        let pool = options.connect(database_url).await.map_err(|e| {
            OrmError::Connection(format!("Failed to create {} pool: {}", dialect, e))
        })?;

        debug!(%dialect, "Database pool created");
        Ok(Self { pool, dialect })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool, dialect: SqlDialect) -> Self {
        Self { pool, dialect }
    }

    /// Get the database pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Round-trip a trivial query to check connectivity
    pub async fn health_check(&self) -> OrmResult<Duration> {
        let start = std::time::Instant::now();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| OrmError::Connection(format!("Health check failed: {}", e)))?;

        Ok(start.elapsed())
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TransactionalExecutor for AnyBackend {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn with_transaction<R, E>(&self, work: &mut dyn UnitOfWork<R, E>) -> Result<R, E>
    where
        R: Send,
        E: From<OrmError> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| E::from(transaction_error("begin", e)))?;
        debug!("Transaction started");

        let outcome = {
            let mut executor = AnyConnectionExecutor::new(&mut *tx, self.dialect);
            work.run(&mut executor).await
        };

        match outcome {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| E::from(transaction_error("commit", e)))?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Failed to roll back transaction: {}", rollback_err);
                } else {
                    debug!("Transaction rolled back");
                }
                Err(err)
            }
        }
    }

    async fn with_connection<R, E>(&self, work: &mut dyn UnitOfWork<R, E>) -> Result<R, E>
    where
        R: Send,
        E: From<OrmError> + Send,
    {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            E::from(OrmError::Connection(format!("Failed to acquire connection: {}", e)))
        })?;

        let mut executor = AnyConnectionExecutor::new(&mut *conn, self.dialect);
        work.run(&mut executor).await
    }
}

/// Executor over a borrowed connection, either pooled or inside a transaction
pub struct AnyConnectionExecutor<'c> {
    conn: &'c mut AnyConnection,
    dialect: SqlDialect,
}

impl<'c> AnyConnectionExecutor<'c> {
    pub fn new(conn: &'c mut AnyConnection, dialect: SqlDialect) -> Self {
        Self { conn, dialect }
    }
}

#[async_trait]
impl<'c> DatabaseExecutor for AnyConnectionExecutor<'c> {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn exec(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let result = query.execute(&mut *self.conn).await.map_err(OrmError::from)?;

        Ok(result.rows_affected())
    }

    async fn first_cell(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Option<DatabaseValue>> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let row = query
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(OrmError::from)?;

        Ok(row.as_ref().map(first_column_value))
    }

    async fn first_column(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<DatabaseValue>> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let rows = query
            .fetch_all(&mut *self.conn)
            .await
            .map_err(OrmError::from)?;

        Ok(rows.iter().map(first_column_value).collect())
    }
}

fn transaction_error(action: &str, err: sqlx::Error) -> OrmError {
    match OrmError::from(err) {
        OrmError::Connection(msg) => OrmError::Connection(msg),
        other => OrmError::Transaction(format!("Failed to {} transaction: {}", action, other)),
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &DatabaseValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
    }
}

/// Decode the first column of a row into a DatabaseValue
///
/// The `Any` driver only reports a coarse type, so decoding tries the
/// supported Rust types in turn. Anything undecodable becomes `Null`.
fn first_column_value(row: &AnyRow) -> DatabaseValue {
    if row.is_empty() {
        return DatabaseValue::Null;
    }

    if let Ok(value) = row.try_get::<Option<i64>, _>(0) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(0) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(0) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(0) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(0) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(0) {
        return value.into();
    }

    DatabaseValue::Null
}
