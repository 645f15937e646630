#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tidemark_orm::{
    async_trait, AnyBackend, DatabasePoolConfig, DatabaseValue, Migration, OrmError, OrmResult,
    Schema,
};

/// Fresh in-memory SQLite database behind the `Any` driver
pub async fn memory_backend() -> Arc<AnyBackend> {
    let backend = AnyBackend::connect("sqlite::memory:", DatabasePoolConfig::default())
        .await
        .unwrap();
    Arc::new(backend)
}

pub async fn table_exists(backend: &AnyBackend, table: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(backend.pool())
            .await
            .unwrap();
    count > 0
}

pub async fn column_exists(backend: &AnyBackend, table: &str, column: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(backend.pool())
            .await
            .unwrap();
    count > 0
}

pub async fn table_sql(backend: &AnyBackend, table: &str) -> String {
    sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_one(backend.pool())
        .await
        .unwrap()
}

/// Shared record of `up`/`down` invocations, e.g. `"up:create_users_table"`
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Creates and drops a one-column table named after the migration
pub struct TableMigration {
    name: String,
    table: String,
    journal: Journal,
}

impl TableMigration {
    pub fn new(name: &str, table: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            journal: journal.clone(),
        }
    }
}

#[async_trait]
impl Migration for TableMigration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        self.journal.push(format!("up:{}", self.name));
        schema
            .create_table(&self.table, |table| {
                table.id();
                table.string("label").not_null();
            })
            .await
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        self.journal.push(format!("down:{}", self.name));
        schema.drop_table(&self.table).await
    }
}

/// Creates a table, then fails
pub struct BrokenMigration {
    pub name: String,
    pub fail_on_down: bool,
}

#[async_trait]
impl Migration for BrokenMigration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        if self.fail_on_down {
            return schema
                .create_table("survivors", |table| {
                    table.id();
                })
                .await;
        }
        schema
            .create_table("half_done", |table| {
                table.id();
            })
            .await?;
        Err(OrmError::Migration("column type not supported".to_string()))
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        if self.fail_on_down {
            schema.execute("DROP TABLE no_such_table").await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct CreateUsersTable;

#[async_trait]
impl Migration for CreateUsersTable {
    fn name(&self) -> &str {
        "2024_01_15_000001_create_users_table"
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema
            .create_table("users", |table| {
                table.id();
                table.string("name").not_null();
                table.string("email").not_null().unique();
                table.timestamps();
            })
            .await
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema.drop_table("users").await
    }
}

#[derive(Default)]
pub struct CreateArticlesTable;

#[async_trait]
impl Migration for CreateArticlesTable {
    fn name(&self) -> &str {
        "2024_01_15_000002_create_articles_table"
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema
            .create_table("articles", |table| {
                table.id();
                table.string("title").not_null();
                table.text("content").not_null();
                table.integer("status").default_value(1);
                table.integer("user_id");
                table.timestamps();
            })
            .await?;
        schema.create_index("articles", &["user_id"], None).await
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema.drop_index("articles", "idx_articles_user_id").await?;
        schema.drop_table("articles").await
    }
}

#[derive(Default)]
pub struct AddSlugToArticles;

#[async_trait]
impl Migration for AddSlugToArticles {
    fn name(&self) -> &str {
        "2024_01_20_000001_add_slug_to_articles"
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema
            .add_column("articles", |table| {
                table.string_with_length("slug", 120).nullable();
            })
            .await
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema.drop_column("articles", "slug").await
    }
}

/// Inserts a row through bound parameters
#[derive(Default)]
pub struct SeedAdminUser;

#[async_trait]
impl Migration for SeedAdminUser {
    fn name(&self) -> &str {
        "2024_01_16_000001_seed_admin_user"
    }

    async fn up(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema
            .execute_with(
                "INSERT INTO users (name, email) VALUES (?, ?)",
                &[
                    DatabaseValue::from("admin"),
                    DatabaseValue::from("admin@example.com"),
                ],
            )
            .await?;
        Ok(())
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema
            .execute_with(
                "DELETE FROM users WHERE email = ?",
                &[DatabaseValue::from("admin@example.com")],
            )
            .await?;
        Ok(())
    }
}
