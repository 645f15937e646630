//! Error types for the migration engine
//!
//! `OrmError` covers the database primitives (connections, statements,
//! transactions, schema building). `MigrationError` is the taxonomy the
//! migration manager surfaces to its caller.

use std::fmt;

use crate::migrations::definitions::MigrationDirection;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database primitives
#[derive(Debug, Clone)]
pub enum OrmError {
    /// Statement execution or row decoding error
    Database(String),
    /// Connection pool or connectivity error
    Connection(String),
    /// Transaction begin/commit/rollback error
    Transaction(String),
    /// Migration authoring error raised from inside `up`/`down`
    Migration(String),
    /// Schema definition error
    Schema(String),
    /// Query building error
    Query(String),
    /// Configuration error
    Configuration(String),
}

impl OrmError {
    /// Whether this error means the database could not be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(self, OrmError::Connection(_))
    }
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::Database(msg) => write!(f, "Database error: {}", msg),
            OrmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            OrmError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            OrmError::Migration(msg) => write!(f, "Migration error: {}", msg),
            OrmError::Schema(msg) => write!(f, "Schema error: {}", msg),
            OrmError::Query(msg) => write!(f, "Query error: {}", msg),
            OrmError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for OrmError {}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => OrmError::Connection(err.to_string()),
            _ => OrmError::Database(err.to_string()),
        }
    }
}

/// Errors surfaced by the migration registry and manager
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The discovery source could not resolve a scope
    #[error("Migration discovery failed for scope '{scope}': {reason}")]
    Discovery { scope: String, reason: String },

    /// A discovered migration type could not be constructed
    #[error("Failed to instantiate migration {type_name}: {reason}")]
    Instantiation { type_name: String, reason: String },

    /// `up` or `down` failed; the enclosing transaction was rolled back
    #[error("Migration '{identity}' failed during {direction}: {source}")]
    Execution {
        identity: String,
        direction: MigrationDirection,
        #[source]
        source: OrmError,
    },

    /// Reading or writing the ledger row for one migration failed
    #[error("Ledger update for migration '{identity}' failed: {source}")]
    Ledger {
        identity: String,
        #[source]
        source: OrmError,
    },

    /// Two registry entries resolve to the same ledger identity
    #[error("Duplicate migration identity '{0}': every migration needs a unique name")]
    DuplicateIdentity(String),

    /// Ledger bookkeeping, transaction or connectivity failure
    #[error(transparent)]
    Database(#[from] OrmError),
}

impl MigrationError {
    /// Whether the failure came from an unreachable database rather than migration logic
    pub fn is_connectivity(&self) -> bool {
        match self {
            MigrationError::Database(err) | MigrationError::Ledger { source: err, .. } => {
                err.is_connectivity()
            }
            _ => false,
        }
    }

    /// Identity of the migration that failed, when the failure belongs to one
    pub fn identity(&self) -> Option<&str> {
        match self {
            MigrationError::Execution { identity, .. } | MigrationError::Ledger { identity, .. } => {
                Some(identity)
            }
            MigrationError::DuplicateIdentity(identity) => Some(identity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_pool_errors_map_to_connection() {
        let err: OrmError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_connectivity());

        let err: OrmError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_connectivity());
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_execution_error_message_names_migration() {
        let err = MigrationError::Execution {
            identity: "create_articles_table".to_string(),
            direction: MigrationDirection::Up,
            source: OrmError::Database("table already exists".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("create_articles_table"));
        assert!(message.contains("up"));
        assert!(message.contains("table already exists"));
        assert_eq!(err.identity(), Some("create_articles_table"));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_ledger_error_keeps_identity() {
        let err = MigrationError::Ledger {
            identity: "create_users_table".to_string(),
            source: OrmError::Connection("reset by peer".to_string()),
        };

        assert_eq!(err.identity(), Some("create_users_table"));
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("reset by peer"));
    }

    #[test]
    fn test_connectivity_is_detected_through_wrapper() {
        let err = MigrationError::from(OrmError::Connection("refused".to_string()));
        assert!(err.is_connectivity());
        assert_eq!(err.identity(), None);
    }
}
