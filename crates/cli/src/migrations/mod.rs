//! Migrations shipped with the application

mod create_articles_table;
mod create_users_table;

pub use create_articles_table::CreateArticlesTable;
pub use create_users_table::CreateUsersTable;

use tidemark_orm::StaticMigrationSource;

/// Scope every application migration is registered under
pub const SCOPE: &str = "tidemark_cli::migrations";

/// Source resolving `SCOPE` to the application's migrations
///
/// Discovery applies these by type name (`CreateArticlesTable` before
/// `CreateUsersTable`), not by their timestamped names, so none of them
/// may depend on another.
pub fn source() -> StaticMigrationSource {
    let mut source = StaticMigrationSource::new();
    source
        .register::<CreateUsersTable>(SCOPE)
        .register::<CreateArticlesTable>(SCOPE);
    source
}
