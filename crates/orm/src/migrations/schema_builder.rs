//! Schema Builder - DSL for creating database schema changes
//!
//! Provides a fluent interface for building SQL schema modification statements
//! commonly used in migrations. Every statement is rendered for one
//! `SqlDialect`, so the same migration produces valid DDL on PostgreSQL,
//! MySQL and SQLite.

use tracing::debug;

use crate::backends::{DatabaseExecutor, DatabaseValue, SqlDialect};
use crate::error::OrmResult;

/// Basic schema operations for migrations
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    dialect: SqlDialect,
    statements: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder for a dialect
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            statements: Vec::new(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Create a new table
    pub fn create_table<F>(&mut self, table_name: &str, callback: F) -> &mut Self
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut table_builder = TableBuilder::new(table_name, self.dialect);
        callback(&mut table_builder);

        self.statements.push(table_builder.to_sql());
        self
    }

    /// Create a table unless it already exists
    pub fn create_table_if_not_exists<F>(&mut self, table_name: &str, callback: F) -> &mut Self
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut table_builder = TableBuilder::new(table_name, self.dialect);
        table_builder.if_not_exists = true;
        callback(&mut table_builder);

        self.statements.push(table_builder.to_sql());
        self
    }

    /// Drop a table
    pub fn drop_table(&mut self, table_name: &str) -> &mut Self {
        self.statements.push(format!("DROP TABLE {}", table_name));
        self
    }

    /// Drop a table if it exists
    pub fn drop_table_if_exists(&mut self, table_name: &str) -> &mut Self {
        self.statements
            .push(format!("DROP TABLE IF EXISTS {}", table_name));
        self
    }

    /// Rename a table
    pub fn rename_table(&mut self, from: &str, to: &str) -> &mut Self {
        self.statements
            .push(format!("ALTER TABLE {} RENAME TO {}", from, to));
        self
    }

    /// Add the columns defined in `callback` to an existing table, one
    /// `ALTER TABLE` statement per column
    pub fn add_column<F>(&mut self, table_name: &str, callback: F) -> &mut Self
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut table_builder = TableBuilder::new(table_name, self.dialect);
        callback(&mut table_builder);

        for column in &table_builder.columns {
            self.statements.push(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table_name,
                column.to_sql(self.dialect)
            ));
        }
        self
    }

    /// Drop a column from existing table
    pub fn drop_column(&mut self, table_name: &str, column_name: &str) -> &mut Self {
        self.statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            table_name, column_name
        ));
        self
    }

    /// Create an index, named `idx_<table>_<columns>` unless a name is given
    pub fn create_index(
        &mut self,
        table_name: &str,
        column_names: &[&str],
        index_name: Option<&str>,
    ) -> &mut Self {
        self.push_index(table_name, column_names, index_name, false)
    }

    /// Create a unique index, named `uniq_<table>_<columns>` unless a name is given
    pub fn create_unique_index(
        &mut self,
        table_name: &str,
        column_names: &[&str],
        index_name: Option<&str>,
    ) -> &mut Self {
        self.push_index(table_name, column_names, index_name, true)
    }

    fn push_index(
        &mut self,
        table_name: &str,
        column_names: &[&str],
        index_name: Option<&str>,
        unique: bool,
    ) -> &mut Self {
        let prefix = if unique { "uniq" } else { "idx" };
        let default_name = format!("{}_{}_{}", prefix, table_name, column_names.join("_"));
        let index_name = index_name.unwrap_or(&default_name);
        self.statements.push(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            index_name,
            table_name,
            column_names.join(", ")
        ));
        self
    }

    /// Drop an index
    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> &mut Self {
        let sql = if self.dialect.drop_index_needs_table() {
            format!("DROP INDEX {} ON {}", index_name, table_name)
        } else {
            format!("DROP INDEX IF EXISTS {}", index_name)
        };
        self.statements.push(sql);
        self
    }

    /// Append a raw statement
    pub fn raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.statements.push(sql.into());
        self
    }

    /// Get all SQL statements
    pub fn to_sql(&self) -> Vec<String> {
        self.statements.clone()
    }

    /// All statements as a single SQL script
    pub fn build(&self) -> String {
        self.statements
            .iter()
            .map(|statement| format!("{};", statement))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Column types understood by the table builder
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    /// Auto-increment integer primary key
    Increments,
    String(u32),
    Text,
    Integer,
    BigInteger,
    Boolean,
    Float,
    Timestamp,
}

impl ColumnType {
    pub fn to_sql(&self, dialect: SqlDialect) -> String {
        match self {
            ColumnType::Increments => dialect.id_column().to_string(),
            ColumnType::String(length) => format!("VARCHAR({})", length),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => dialect.integer_type().to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Boolean => dialect.boolean_type().to_string(),
            ColumnType::Float => dialect.float_type().to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnDefault {
    Value(DatabaseValue),
    Expression(String),
}

/// A single column in a table definition
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    name: String,
    column_type: ColumnType,
    nullable: Option<bool>,
    default: Option<ColumnDefault>,
    unique: bool,
}

impl ColumnDefinition {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: None,
            default: None,
            unique: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    /// Default value rendered as a literal for the table's dialect
    pub fn default_value(&mut self, value: impl Into<DatabaseValue>) -> &mut Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }

    /// Default given as a SQL expression, e.g. `CURRENT_TIMESTAMP`
    pub fn default_expression(&mut self, expression: &str) -> &mut Self {
        self.default = Some(ColumnDefault::Expression(expression.to_string()));
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn to_sql(&self, dialect: SqlDialect) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.to_sql(dialect));

        match self.nullable {
            Some(false) => sql.push_str(" NOT NULL"),
            Some(true) if dialect == SqlDialect::MySQL => sql.push_str(" NULL"),
            _ => {}
        }

        match &self.default {
            Some(ColumnDefault::Value(value)) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(&value.to_sql_literal(dialect));
            }
            Some(ColumnDefault::Expression(expression)) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(expression);
            }
            None => {}
        }

        if self.unique {
            sql.push_str(" UNIQUE");
        }

        sql
    }
}

/// Table builder for CREATE TABLE statements
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table_name: String,
    dialect: SqlDialect,
    if_not_exists: bool,
    columns: Vec<ColumnDefinition>,
    constraints: Vec<String>,
}

impl TableBuilder {
    pub fn new(table_name: &str, dialect: SqlDialect) -> Self {
        Self {
            table_name: table_name.to_string(),
            dialect,
            if_not_exists: false,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a column of any type
    pub fn column(&mut self, name: &str, column_type: ColumnType) -> &mut ColumnDefinition {
        let index = self.columns.len();
        self.columns.push(ColumnDefinition::new(name, column_type));
        &mut self.columns[index]
    }

    /// Add an `id` auto-increment primary key
    pub fn id(&mut self) -> &mut ColumnDefinition {
        self.increments("id")
    }

    /// Add an auto-increment primary key column
    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Increments)
    }

    /// Add a `VARCHAR(255)` column
    pub fn string(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::String(255))
    }

    pub fn string_with_length(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.column(name, ColumnType::String(length))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Text)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Integer)
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::BigInteger)
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Boolean)
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Float)
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Timestamp)
    }

    /// Add `created_at` and `updated_at` columns defaulting to the current time
    pub fn timestamps(&mut self) -> &mut Self {
        self.timestamp("created_at")
            .not_null()
            .default_expression("CURRENT_TIMESTAMP");
        self.timestamp("updated_at")
            .not_null()
            .default_expression("CURRENT_TIMESTAMP");
        self
    }

    /// Add a primary key constraint
    pub fn primary_key(&mut self, columns: &[&str]) -> &mut Self {
        self.constraints
            .push(format!("PRIMARY KEY ({})", columns.join(", ")));
        self
    }

    /// Add a foreign key constraint
    pub fn foreign_key(
        &mut self,
        column: &str,
        references_table: &str,
        references_column: &str,
    ) -> &mut Self {
        self.constraints.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            column, references_table, references_column
        ));
        self
    }

    /// Add a unique constraint
    pub fn unique(&mut self, columns: &[&str]) -> &mut Self {
        self.constraints
            .push(format!("UNIQUE ({})", columns.join(", ")));
        self
    }

    /// Build the CREATE TABLE SQL
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.to_sql(self.dialect))
            .collect();
        parts.extend(self.constraints.iter().cloned());

        format!(
            "CREATE TABLE {}{} (\n    {}\n)",
            if self.if_not_exists { "IF NOT EXISTS " } else { "" },
            self.table_name,
            parts.join(",\n    ")
        )
    }
}

/// Schema context handed to `Migration::up` and `Migration::down`
///
/// Statements run on the executor of the enclosing transaction.
pub struct Schema<'a> {
    executor: &'a mut dyn DatabaseExecutor,
}

impl<'a> Schema<'a> {
    pub fn new(executor: &'a mut dyn DatabaseExecutor) -> Self {
        Self { executor }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.executor.dialect()
    }

    /// A fresh builder for this connection's dialect
    pub fn builder(&self) -> SchemaBuilder {
        SchemaBuilder::new(self.dialect())
    }

    /// Run every statement of a builder, in order
    pub async fn apply(&mut self, builder: &SchemaBuilder) -> OrmResult<()> {
        for statement in &builder.statements {
            debug!(sql = %statement, "Executing schema statement");
            self.executor.exec(statement, &[]).await?;
        }
        Ok(())
    }

    pub async fn create_table<F>(&mut self, table_name: &str, callback: F) -> OrmResult<()>
    where
        F: FnOnce(&mut TableBuilder) + Send,
    {
        let mut builder = self.builder();
        builder.create_table(table_name, callback);
        self.apply(&builder).await
    }

    pub async fn drop_table(&mut self, table_name: &str) -> OrmResult<()> {
        let mut builder = self.builder();
        builder.drop_table(table_name);
        self.apply(&builder).await
    }

    pub async fn drop_table_if_exists(&mut self, table_name: &str) -> OrmResult<()> {
        let mut builder = self.builder();
        builder.drop_table_if_exists(table_name);
        self.apply(&builder).await
    }

    pub async fn add_column<F>(&mut self, table_name: &str, callback: F) -> OrmResult<()>
    where
        F: FnOnce(&mut TableBuilder) + Send,
    {
        let mut builder = self.builder();
        builder.add_column(table_name, callback);
        self.apply(&builder).await
    }

    pub async fn drop_column(&mut self, table_name: &str, column_name: &str) -> OrmResult<()> {
        let mut builder = self.builder();
        builder.drop_column(table_name, column_name);
        self.apply(&builder).await
    }

    pub async fn create_index(
        &mut self,
        table_name: &str,
        column_names: &[&str],
        index_name: Option<&str>,
    ) -> OrmResult<()> {
        let mut builder = self.builder();
        builder.create_index(table_name, column_names, index_name);
        self.apply(&builder).await
    }

    pub async fn drop_index(&mut self, table_name: &str, index_name: &str) -> OrmResult<()> {
        let mut builder = self.builder();
        builder.drop_index(table_name, index_name);
        self.apply(&builder).await
    }

    /// Execute a raw statement
    pub async fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        debug!(sql = %sql, "Executing raw statement");
        self.executor.exec(sql, &[]).await
    }

    /// Execute a raw statement with bound parameters
    pub async fn execute_with(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.executor.exec(sql, params).await
    }
}
