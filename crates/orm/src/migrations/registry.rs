//! Migration registry
//!
//! Holds the ordered list of known migrations. Explicit registrations keep
//! call order; each discovery batch is sorted by type name before it is
//! appended, so the final order never depends on how a source enumerates.

use std::collections::HashSet;

use tracing::{error, info, warn};

use super::definitions::{IdentityPolicy, Migration, MigrationOrigin, RegisteredMigration};
use super::source::MigrationSource;
use crate::backends::SqlDialect;
use crate::error::MigrationError;

/// Ordered collection of migrations for one dialect
#[derive(Debug)]
pub struct MigrationRegistry {
    dialect: SqlDialect,
    migrations: Vec<RegisteredMigration>,
}

impl MigrationRegistry {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            migrations: Vec::new(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Append a migration. Duplicates are not filtered here; see `validate`.
    pub fn add<M>(&mut self, migration: M) -> &mut Self
    where
        M: Migration + 'static,
    {
        self.migrations.push(RegisteredMigration::new(
            Box::new(migration),
            std::any::type_name::<M>(),
            self.dialect,
            MigrationOrigin::Explicit,
        ));
        self
    }

    /// Append an already boxed migration under the given type name
    pub fn add_boxed(&mut self, migration: Box<dyn Migration>, type_name: &str) -> &mut Self {
        self.migrations.push(RegisteredMigration::new(
            migration,
            type_name,
            self.dialect,
            MigrationOrigin::Explicit,
        ));
        self
    }

    /// Append every migration `source` knows under `scope`
    ///
    /// Candidates that fail to instantiate are skipped. A source error leaves
    /// the registry untouched.
    pub fn discover(&mut self, source: &dyn MigrationSource, scope: &str) -> &mut Self {
        let candidates = match source.discover(scope) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(scope = %scope, error = %err, "Failed to discover migrations");
                return self;
            }
        };

        let mut discovered = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match candidate.instantiate() {
                Ok(migration) => discovered.push(RegisteredMigration::new(
                    migration,
                    candidate.type_name.clone(),
                    self.dialect,
                    MigrationOrigin::Discovered {
                        scope: scope.to_string(),
                    },
                )),
                Err(err) => {
                    warn!(scope = %scope, error = %err, "Skipping migration");
                }
            }
        }

        discovered.sort_by(|a, b| {
            a.simple_name()
                .cmp(b.simple_name())
                .then_with(|| a.type_name().cmp(b.type_name()))
        });

        info!(scope = %scope, count = discovered.len(), "Discovered migrations");
        self.migrations.extend(discovered);
        self
    }

    /// Ledger identities in registry order
    pub fn identities(&self, policy: IdentityPolicy) -> Vec<String> {
        self.migrations
            .iter()
            .enumerate()
            .map(|(index, entry)| policy.identity(entry, index))
            .collect()
    }

    /// Identities shared by more than one entry, each listed once
    pub fn duplicate_identities(&self, policy: IdentityPolicy) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for identity in self.identities(policy) {
            if !seen.insert(identity.clone()) && !duplicates.contains(&identity) {
                duplicates.push(identity);
            }
        }
        duplicates
    }

    /// Reject registries where two entries share a ledger identity
    pub fn validate(&self, policy: IdentityPolicy) -> Result<(), MigrationError> {
        match self.duplicate_identities(policy).into_iter().next() {
            Some(identity) => Err(MigrationError::DuplicateIdentity(identity)),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisteredMigration> {
        self.migrations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RegisteredMigration> {
        self.migrations.get(index)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl<'a> IntoIterator for &'a MigrationRegistry {
    type Item = &'a RegisteredMigration;
    type IntoIter = std::slice::Iter<'a, RegisteredMigration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::OrmResult;
    use crate::migrations::schema_builder::Schema;
    use crate::migrations::source::{MigrationCandidate, StaticMigrationSource};

    macro_rules! noop_migration {
        ($name:ident) => {
            #[derive(Default)]
            struct $name;

            #[async_trait]
            impl Migration for $name {
                async fn up(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
                    Ok(())
                }

                async fn down(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
                    Ok(())
                }
            }
        };
    }

    noop_migration!(Alpha);
    noop_migration!(Bravo);
    noop_migration!(Charlie);

    struct Named(&'static str);

    #[async_trait]
    impl Migration for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn up(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
            Ok(())
        }

        async fn down(&self, _schema: &mut Schema<'_>) -> OrmResult<()> {
            Ok(())
        }
    }

    /// Yields candidates in a fixed, deliberately unsorted order
    struct ShuffledSource(Vec<&'static str>);

    impl MigrationSource for ShuffledSource {
        fn discover(&self, _scope: &str) -> Result<Vec<MigrationCandidate>, MigrationError> {
            Ok(self
                .0
                .iter()
                .map(|type_name| {
                    let name = *type_name;
                    MigrationCandidate::new(name, move || match name {
                        "app::migrations::Alpha" => Ok(Box::new(Alpha) as Box<dyn Migration>),
                        "app::migrations::Bravo" => Ok(Box::new(Bravo) as Box<dyn Migration>),
                        "app::migrations::Charlie" => Ok(Box::new(Charlie) as Box<dyn Migration>),
                        other => Err(format!("{} has no default constructor", other)),
                    })
                })
                .collect())
        }
    }

    fn names(registry: &MigrationRegistry) -> Vec<String> {
        registry.iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn test_add_keeps_call_order() {
        let mut registry = MigrationRegistry::new(SqlDialect::SQLite);
        registry.add(Charlie).add(Alpha).add(Bravo);

        assert_eq!(names(&registry), vec!["Charlie", "Alpha", "Bravo"]);
        assert!(registry
            .iter()
            .all(|m| m.origin() == &MigrationOrigin::Explicit && m.dialect() == SqlDialect::SQLite));
    }

    #[test]
    fn test_discovery_is_sorted_regardless_of_source_order() {
        let orders = [
            vec!["app::migrations::Charlie", "app::migrations::Alpha", "app::migrations::Bravo"],
            vec!["app::migrations::Bravo", "app::migrations::Charlie", "app::migrations::Alpha"],
        ];

        for order in orders {
            let mut registry = MigrationRegistry::new(SqlDialect::PostgreSQL);
            registry.discover(&ShuffledSource(order), "app::migrations");
            assert_eq!(names(&registry), vec!["Alpha", "Bravo", "Charlie"]);
        }
    }

    #[test]
    fn test_discovered_batch_is_appended_after_explicit_entries() {
        let mut registry = MigrationRegistry::new(SqlDialect::SQLite);
        registry.add(Named("0000_bootstrap"));
        registry.discover(
            &ShuffledSource(vec!["app::migrations::Bravo", "app::migrations::Alpha"]),
            "app::migrations",
        );
        registry.add(Named("9999_late"));

        assert_eq!(
            names(&registry),
            vec!["0000_bootstrap", "Alpha", "Bravo", "9999_late"]
        );
        assert_eq!(
            registry.get(1).map(|m| m.origin().clone()),
            Some(MigrationOrigin::Discovered {
                scope: "app::migrations".to_string()
            })
        );
    }

    #[test]
    fn test_failed_instantiation_is_skipped() {
        let mut registry = MigrationRegistry::new(SqlDialect::SQLite);
        registry.discover(
            &ShuffledSource(vec![
                "app::migrations::Bravo",
                "app::migrations::NeedsArguments",
                "app::migrations::Alpha",
            ]),
            "app::migrations",
        );

        assert_eq!(names(&registry), vec!["Alpha", "Bravo"]);
    }

    #[test]
    fn test_failed_source_adds_nothing() {
        let mut registry = MigrationRegistry::new(SqlDialect::SQLite);
        registry.add(Alpha);
        registry.discover(&StaticMigrationSource::new(), "app::migrations");

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_identities_and_duplicates() {
        let mut registry = MigrationRegistry::new(SqlDialect::SQLite);
        registry.add(Alpha).add(Bravo).add(Alpha);

        assert_eq!(
            registry.identities(IdentityPolicy::Positional),
            vec!["migration_1", "migration_2", "migration_3"]
        );
        assert!(registry.validate(IdentityPolicy::Positional).is_ok());

        let err = registry.validate(IdentityPolicy::Intrinsic).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateIdentity(ref id) if id == "Alpha"));

        registry.add(Alpha).add(Bravo);
        assert_eq!(
            registry.duplicate_identities(IdentityPolicy::Intrinsic),
            vec!["Alpha", "Bravo"]
        );
        assert!(registry
            .duplicate_identities(IdentityPolicy::Positional)
            .is_empty());
    }

    #[test]
    fn test_add_boxed_uses_given_type_name() {
        let mut registry = MigrationRegistry::new(SqlDialect::PostgreSQL);
        registry
            .add(Alpha)
            .add_boxed(Box::new(Named("2024_02_01_000001_seed_roles")), "app::seeds::SeedRoles");

        let entry = registry.get(1).unwrap();
        assert_eq!(entry.name(), "2024_02_01_000001_seed_roles");
        assert_eq!(entry.type_name(), "app::seeds::SeedRoles");
        assert_eq!(entry.simple_name(), "SeedRoles");
        assert_eq!(entry.origin(), &MigrationOrigin::Explicit);
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = MigrationRegistry::new(SqlDialect::MySQL);
        assert!(registry.is_empty());
        assert!(registry.identities(IdentityPolicy::Intrinsic).is_empty());
        assert!(registry.validate(IdentityPolicy::Intrinsic).is_ok());
    }
}
