//! Core Database Backend Traits
//!
//! This module defines the primitives the migration engine needs from a
//! database: a dialect tag, bindable values, a statement executor, and a
//! transactional capability that runs a unit of work atomically. These traits
//! abstract away the driver so the ledger and manager never see sqlx types.

use async_trait::async_trait;

use crate::error::{OrmError, OrmResult};

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    #[default]
    SQLite,
}

impl SqlDialect {
    /// Parse a dialect name, falling back to the embedded dialect for unknown or missing names
    pub fn from_name_or_default(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }

    /// Detect the dialect from a database URL scheme
    pub fn from_url(url: &str) -> OrmResult<Self> {
        if url.starts_with("postgresql://") || url.starts_with("postgres://") {
            Ok(SqlDialect::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(SqlDialect::MySQL)
        } else if url.starts_with("sqlite:") || url.starts_with("file:") {
            Ok(SqlDialect::SQLite)
        } else {
            Err(OrmError::Configuration(format!(
                "Unable to detect database dialect from URL: {}",
                url
            )))
        }
    }

    /// Auto-increment primary key column definition (without the column name)
    pub fn id_column(&self) -> &'static str {
        match self {
            SqlDialect::MySQL => "INT AUTO_INCREMENT PRIMARY KEY",
            SqlDialect::PostgreSQL => "SERIAL PRIMARY KEY",
            SqlDialect::SQLite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// Get the parameter placeholder style for this dialect
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    pub fn integer_type(&self) -> &'static str {
        match self {
            SqlDialect::MySQL => "INT",
            SqlDialect::PostgreSQL | SqlDialect::SQLite => "INTEGER",
        }
    }

    pub fn boolean_type(&self) -> &'static str {
        match self {
            SqlDialect::MySQL => "TINYINT(1)",
            SqlDialect::PostgreSQL => "BOOLEAN",
            SqlDialect::SQLite => "INTEGER",
        }
    }

    pub fn float_type(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "DOUBLE PRECISION",
            SqlDialect::MySQL => "DOUBLE",
            SqlDialect::SQLite => "REAL",
        }
    }

    /// Render a boolean literal
    pub fn boolean_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (SqlDialect::PostgreSQL, true) => "TRUE",
            (SqlDialect::PostgreSQL, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Whether `DROP INDEX` needs the owning table (`DROP INDEX name ON table`)
    pub fn drop_index_needs_table(&self) -> bool {
        matches!(self, SqlDialect::MySQL)
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "sqlite" | "sqlite3" => Ok(SqlDialect::SQLite),
            _ => Err(format!("Unsupported database dialect: {}", s)),
        }
    }
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Interpret the value as an integer count, if it is one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int32(i) => Some(*i as i64),
            DatabaseValue::Int64(i) => Some(*i),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value as a SQL literal, e.g. for column defaults
    pub fn to_sql_literal(&self, dialect: SqlDialect) -> String {
        match self {
            DatabaseValue::Null => "NULL".to_string(),
            DatabaseValue::Bool(b) => dialect.boolean_literal(*b).to_string(),
            DatabaseValue::Int32(i) => i.to_string(),
            DatabaseValue::Int64(i) => i.to_string(),
            DatabaseValue::Float64(f) => f.to_string(),
            DatabaseValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            DatabaseValue::Bytes(b) => match dialect {
                SqlDialect::PostgreSQL => format!("'\\x{}'", hex::encode(b)),
                SqlDialect::MySQL | SqlDialect::SQLite => format!("X'{}'", hex::encode(b)),
            },
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Statement execution against the ambient connection or transaction
#[async_trait]
pub trait DatabaseExecutor: Send {
    /// Dialect of the underlying connection
    fn dialect(&self) -> SqlDialect;

    /// Execute a statement and return the affected rows count
    async fn exec(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Execute a query and return the first column of the first row, if any
    async fn first_cell(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Option<DatabaseValue>>;

    /// Execute a query and return the first column of every row
    async fn first_column(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<DatabaseValue>>;
}

/// A unit of work run against an executor handed in by the transactional context
#[async_trait]
pub trait UnitOfWork<R, E>: Send {
    async fn run(&mut self, executor: &mut dyn DatabaseExecutor) -> Result<R, E>;
}

/// Capability to run units of work inside a transaction or on a plain connection
#[async_trait]
pub trait TransactionalExecutor: Send + Sync {
    /// Dialect of the target database
    fn dialect(&self) -> SqlDialect;

    /// Run `work` inside one transaction: commit on success, roll back and
    /// return the unit's error on failure
    async fn with_transaction<R, E>(&self, work: &mut dyn UnitOfWork<R, E>) -> Result<R, E>
    where
        R: Send,
        E: From<OrmError> + Send;

    /// Run `work` on a pooled connection without opening a transaction
    async fn with_connection<R, E>(&self, work: &mut dyn UnitOfWork<R, E>) -> Result<R, E>
    where
        R: Send,
        E: From<OrmError> + Send;
}

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct DatabasePoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}
