use tidemark_orm::{async_trait, Migration, OrmResult, Schema};

#[derive(Debug, Default)]
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
                table.boolean("is_active").default_value(true);
                table.timestamps();
            })
            .await
    }

    async fn down(&self, schema: &mut Schema<'_>) -> OrmResult<()> {
        schema.drop_table("users").await
    }
}
