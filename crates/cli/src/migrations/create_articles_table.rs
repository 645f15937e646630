use tidemark_orm::{async_trait, Migration, OrmResult, Schema};

#[derive(Debug, Default)]
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
