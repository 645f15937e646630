//! Migration manager configuration

use tidemark_core::config::MigrationSettings;

use super::definitions::IdentityPolicy;

/// Configuration for the migration system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Table name for tracking migrations
    pub table_name: String,
    /// How ledger keys are derived from registry entries
    pub identity_policy: IdentityPolicy,
}

impl MigrationConfig {
    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.identity_policy = policy;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table_name: "migrations".to_string(),
            identity_policy: IdentityPolicy::Intrinsic,
        }
    }
}

impl From<&MigrationSettings> for MigrationConfig {
    fn from(settings: &MigrationSettings) -> Self {
        let identity_policy = if settings.positional_identity {
            IdentityPolicy::Positional
        } else {
            IdentityPolicy::Intrinsic
        };

        Self {
            table_name: settings.migrations_table.clone(),
            identity_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.table_name, "migrations");
        assert_eq!(config.identity_policy, IdentityPolicy::Intrinsic);
    }

    #[test]
    fn test_from_settings() {
        let mut settings = MigrationSettings::new("sqlite::memory:");
        settings.migrations_table = "schema_history".to_string();
        settings.positional_identity = true;

        let config = MigrationConfig::from(&settings);
        assert_eq!(config.table_name, "schema_history");
        assert_eq!(config.identity_policy, IdentityPolicy::Positional);
    }

    #[test]
    fn test_builder_overrides() {
        let config = MigrationConfig::default()
            .with_table("ledger")
            .with_identity_policy(IdentityPolicy::Positional);
        assert_eq!(config.table_name, "ledger");
        assert_eq!(config.identity_policy, IdentityPolicy::Positional);
    }
}
