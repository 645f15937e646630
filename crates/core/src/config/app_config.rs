use crate::config::{ConfigError, ConfigValidator, IdentifierValidator, OneOfValidator};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Configuration trait for environment-driven configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    EnvVar(String),
    Default(String),
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

pub const DIALECT_NAMES: &[&str] = &[
    "postgresql",
    "postgres",
    "pgsql",
    "mysql",
    "mariadb",
    "sqlite",
    "sqlite3",
];

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Settings for running migrations against one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub database_url: String,
    /// Explicit dialect name; inferred from the URL when unset
    pub dialect: Option<String>,
    pub migrations_table: String,
    /// Key the ledger by `migration_<n>` instead of migration names
    pub positional_identity: bool,
    pub max_connections: u32,
    pub log_level: String,
    pub environment: Environment,
}

impl MigrationSettings {
    /// Settings with defaults for everything but the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            dialect: None,
            migrations_table: "migrations".to_string(),
            positional_identity: false,
            max_connections: 5,
            log_level: "info".to_string(),
            environment: Environment::Development,
        }
    }

    /// Load from the environment, preferring `database_url` over `DATABASE_URL`
    pub fn from_env_with_url(database_url: Option<String>) -> Result<Self, ConfigError> {
        let database_url = match database_url {
            Some(url) => url,
            None => get_env_required(
                "DATABASE_URL",
                "Set it to a postgres://, mysql:// or sqlite: URL",
            )?,
        };
        let dialect = get_env_optional("DB_DIALECT");
        let migrations_table = get_env_or_default("MIGRATIONS_TABLE", "migrations");

        let identity = get_env_or_default("MIGRATION_IDENTITY", "intrinsic");
        let positional_identity = match identity.to_lowercase().as_str() {
            "intrinsic" | "name" => false,
            "positional" | "index" => true,
            _ => {
                return Err(ConfigError::invalid_value(
                    "migration_identity",
                    identity,
                    "intrinsic or positional",
                ))
            }
        };

        let max_connections = get_env_or_default("DB_MAX_CONNECTIONS", "5");
        let max_connections = max_connections.parse::<u32>().map_err(|_| {
            ConfigError::invalid_value("max_connections", max_connections.clone(), "valid number")
        })?;

        let log_level = get_env_or_default("LOG_LEVEL", "info");
        let environment = get_env_or_default("ENVIRONMENT", "development");
        let environment = Environment::from_str(&environment)?;

        Ok(MigrationSettings {
            database_url,
            dialect,
            migrations_table,
            positional_identity,
            max_connections,
            log_level,
            environment,
        })
    }
}

impl AppConfigTrait for MigrationSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_url(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::validation_failed("Database URL cannot be empty"));
        }

        if let Some(dialect) = &self.dialect {
            OneOfValidator {
                field: "dialect",
                allowed: DIALECT_NAMES,
            }
            .validate(dialect.as_str())?;
        }

        IdentifierValidator::new("migrations_table").validate(self.migrations_table.as_str())?;

        if self.max_connections == 0 {
            return Err(ConfigError::invalid_value(
                "max_connections",
                "0",
                "at least one connection",
            ));
        }

        OneOfValidator {
            field: "log_level",
            allowed: LOG_LEVELS,
        }
        .validate(self.log_level.as_str())?;

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, var, default) in [
            ("database_url", "DATABASE_URL", None),
            ("dialect", "DB_DIALECT", Some("detected from database_url")),
            ("migrations_table", "MIGRATIONS_TABLE", Some("migrations")),
            ("positional_identity", "MIGRATION_IDENTITY", Some("intrinsic")),
            ("max_connections", "DB_MAX_CONNECTIONS", Some("5")),
            ("log_level", "LOG_LEVEL", Some("info")),
            ("environment", "ENVIRONMENT", Some("development")),
        ] {
            let source = match (env::var(var).is_ok(), default) {
                (false, Some(default)) => ConfigSource::Default(default.to_string()),
                _ => ConfigSource::EnvVar(var.to_string()),
            };
            sources.insert(field.to_string(), source);
        }
        sources
    }
}

// Helper functions for environment variable handling
fn get_env_required(key: &str, hint: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::missing_required(key, hint)),
    }
}

fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_optional(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "DB_DIALECT",
        "MIGRATIONS_TABLE",
        "MIGRATION_IDENTITY",
        "DB_MAX_CONNECTIONS",
        "LOG_LEVEL",
        "ENVIRONMENT",
    ];

    fn clean_test_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_settings_from_env() {
        clean_test_env();
        env::set_var("DATABASE_URL", "postgres://localhost/blog");
        env::set_var("DB_DIALECT", "postgresql");
        env::set_var("MIGRATIONS_TABLE", "schema_history");
        env::set_var("MIGRATION_IDENTITY", "positional");
        env::set_var("DB_MAX_CONNECTIONS", "8");
        env::set_var("LOG_LEVEL", "debug");
        env::set_var("ENVIRONMENT", "production");

        let settings = MigrationSettings::from_env().unwrap();

        assert_eq!(settings.database_url, "postgres://localhost/blog");
        assert_eq!(settings.dialect.as_deref(), Some("postgresql"));
        assert_eq!(settings.migrations_table, "schema_history");
        assert!(settings.positional_identity);
        assert_eq!(settings.max_connections, 8);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.environment, Environment::Production);
        assert!(settings.validate().is_ok());

        clean_test_env();
    }

    #[test]
    #[serial]
    fn test_settings_defaults() {
        clean_test_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");

        let settings = MigrationSettings::from_env().unwrap();

        assert_eq!(settings, MigrationSettings::new("sqlite::memory:"));
        let sources = settings.config_sources();
        assert_eq!(
            sources.get("migrations_table"),
            Some(&ConfigSource::Default("migrations".to_string()))
        );
        assert_eq!(
            sources.get("database_url"),
            Some(&ConfigSource::EnvVar("DATABASE_URL".to_string()))
        );

        clean_test_env();
    }

    #[test]
    #[serial]
    fn test_missing_database_url() {
        clean_test_env();

        match MigrationSettings::from_env() {
            Err(ConfigError::MissingRequired { field, .. }) => assert_eq!(field, "DATABASE_URL"),
            other => panic!("Expected MissingRequired error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_invalid_identity_policy() {
        clean_test_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("MIGRATION_IDENTITY", "random");

        match MigrationSettings::from_env() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "migration_identity")
            }
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }

        clean_test_env();
    }

    #[test]
    #[serial]
    fn test_invalid_max_connections() {
        clean_test_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("DB_MAX_CONNECTIONS", "many");

        assert!(matches!(
            MigrationSettings::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));

        clean_test_env();
    }

    #[test]
    #[serial]
    fn test_explicit_url_wins_over_environment() {
        clean_test_env();
        env::set_var("DATABASE_URL", "postgres://localhost/blog");
        env::set_var("MIGRATIONS_TABLE", "schema_history");

        let settings =
            MigrationSettings::from_env_with_url(Some("sqlite::memory:".to_string())).unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.migrations_table, "schema_history");

        env::remove_var("DATABASE_URL");
        assert!(MigrationSettings::from_env_with_url(Some("sqlite::memory:".to_string())).is_ok());

        clean_test_env();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = MigrationSettings::new("sqlite::memory:");
        settings.migrations_table = "migrations; --".to_string();
        assert!(settings.validate().is_err());

        let mut settings = MigrationSettings::new("sqlite::memory:");
        settings.dialect = Some("oracle".to_string());
        assert!(settings.validate().is_err());

        let mut settings = MigrationSettings::new("sqlite::memory:");
        settings.max_connections = 0;
        assert!(settings.validate().is_err());

        let mut settings = MigrationSettings::new("sqlite::memory:");
        settings.log_level = "verbose".to_string();
        assert!(settings.validate().is_err());

        assert!(MigrationSettings::new("  ").validate().is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::from_str("dev").unwrap(), Environment::Development);
        assert_eq!(Environment::from_str("testing").unwrap(), Environment::Testing);
        assert_eq!(Environment::from_str("PROD").unwrap(), Environment::Production);
        assert!(Environment::from_str("staging").is_err());
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
