//! Migration sources
//!
//! A `MigrationSource` resolves a scope (a module path such as
//! `app::migrations`) to the migration types registered under it. The
//! registry only sees candidates and their factories, never how they were
//! found.

use std::collections::HashMap;
use std::fmt;

use super::definitions::Migration;
use crate::error::MigrationError;

/// Constructor for a discovered migration
pub type MigrationFactory =
    Box<dyn Fn() -> Result<Box<dyn Migration>, String> + Send + Sync>;

/// A migration type found under a scope, not yet instantiated
pub struct MigrationCandidate {
    pub type_name: String,
    pub factory: MigrationFactory,
}

impl MigrationCandidate {
    pub fn new<F>(type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Migration>, String> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            factory: Box::new(factory),
        }
    }

    /// Construct the migration
    pub fn instantiate(&self) -> Result<Box<dyn Migration>, MigrationError> {
        (self.factory)().map_err(|reason| MigrationError::Instantiation {
            type_name: self.type_name.clone(),
            reason,
        })
    }
}

impl fmt::Debug for MigrationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationCandidate")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Discovery capability consumed by `MigrationRegistry::discover`
pub trait MigrationSource: Send + Sync {
    /// Candidates registered under `scope`, in any order
    fn discover(&self, scope: &str) -> Result<Vec<MigrationCandidate>, MigrationError>;
}

#[derive(Clone)]
struct StaticEntry {
    type_name: String,
    factory: std::sync::Arc<dyn Fn() -> Result<Box<dyn Migration>, String> + Send + Sync>,
}

/// Scope-keyed table of migration types, filled explicitly at startup
///
/// ```rust,ignore
/// let mut source = StaticMigrationSource::new();
/// source
///     .register::<CreateUsersTable>("app::migrations")
///     .register::<CreateArticlesTable>("app::migrations");
///
/// registry.discover(&source, "app::migrations");
/// ```
#[derive(Default, Clone)]
pub struct StaticMigrationSource {
    scopes: HashMap<String, Vec<StaticEntry>>,
}

impl StaticMigrationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a default-constructible migration type under `scope`
    pub fn register<M>(&mut self, scope: &str) -> &mut Self
    where
        M: Migration + Default + 'static,
    {
        self.register_with(scope, std::any::type_name::<M>(), || {
            Ok(Box::new(M::default()) as Box<dyn Migration>)
        })
    }

    /// Register a migration under `scope` with a custom factory
    pub fn register_with<F>(&mut self, scope: &str, type_name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn Migration>, String> + Send + Sync + 'static,
    {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .push(StaticEntry {
                type_name: type_name.to_string(),
                factory: std::sync::Arc::new(factory),
            });
        self
    }

    /// Scopes with at least one registration
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }
}

impl MigrationSource for StaticMigrationSource {
    fn discover(&self, scope: &str) -> Result<Vec<MigrationCandidate>, MigrationError> {
        let entries = self
            .scopes
            .get(scope)
            .ok_or_else(|| MigrationError::Discovery {
                scope: scope.to_string(),
                reason: "no migrations registered under this scope".to_string(),
            })?;

        Ok(entries
            .iter()
            .map(|entry| {
                let factory = entry.factory.clone();
                MigrationCandidate::new(entry.type_name.clone(), move || factory())
            })
            .collect())
    }
}

impl fmt::Debug for StaticMigrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scopes: HashMap<&str, Vec<&str>> = self
            .scopes
            .iter()
            .map(|(scope, entries)| {
                (
                    scope.as_str(),
                    entries.iter().map(|e| e.type_name.as_str()).collect(),
                )
            })
            .collect();
        f.debug_struct("StaticMigrationSource")
            .field("scopes", &scopes)
            .finish()
    }
}
