//! Core seams: SQL dialect strategy and the connection primitive.
//!
//! - [`Dialect`]: per-engine SQL text generation. The engine decides *which*
//!   operations are needed and in what order; dialects own the text.
//! - [`Connection`] / [`ConnectionOpener`]: the low-level database driver
//!   boundary. Real drivers live outside this crate; tests supply an
//!   in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{DatabaseConfig, SqlRender};
use crate::core::schema::{ColumnModel, IndexModel, TableModel};
use crate::core::value::{CellValue, Page, Row, SqlStatement};
use crate::error::Result;

/// One filter condition for data browsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Where {
    pub column: String,
    /// SQL comparison operator ("=", "<>", "like", ...).
    #[serde(default = "default_operator")]
    pub operator: String,
    pub value: CellValue,
}

fn default_operator() -> String {
    "=".to_string()
}

/// One ordering term for data browsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    #[serde(default)]
    pub desc: bool,
}

/// SQL syntax strategy for one database engine.
///
/// Implementations are pure text generators: given a schema operation they
/// produce statement text (and bound parameters for DML), never touching a
/// connection. This is what makes cross-dialect DDL export possible: any
/// dialect can render statements for data read through another.
pub trait Dialect: Send + Sync {
    /// Dialect identifier ("mysql", "postgres", "oracle").
    fn kind(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Identifier length cap, when the engine has one.
    fn max_identifier_length(&self) -> Option<usize> {
        None
    }

    /// Quoted table reference, owner-qualified when an owner is given.
    fn owner_table(&self, owner: Option<&str>, table: &str) -> String {
        match owner {
            Some(o) if !o.is_empty() => {
                format!("{}.{}", self.quote_ident(o), self.quote_ident(table))
            }
            _ => self.quote_ident(table),
        }
    }

    /// Render a value as an inline SQL literal for this engine.
    fn value_literal(&self, value: &CellValue) -> String {
        value.to_sql_literal()
    }

    /// Render the type portion of a column definition.
    fn column_type_sql(&self, column: &ColumnModel) -> Result<String>;

    /// Statements creating an owner/schema.
    fn owner_create_sql(&self, owner: &str) -> Vec<String>;

    /// Statements creating a table with its columns, primary key, indexes,
    /// and comments.
    fn table_create_sql(&self, owner: Option<&str>, table: &TableModel) -> Result<Vec<String>>;

    /// Statements dropping a table.
    fn table_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String>;

    /// Statements adding a column.
    fn column_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        column: &ColumnModel,
    ) -> Result<Vec<String>>;

    /// Statements dropping a column.
    fn column_drop_sql(&self, owner: Option<&str>, table: &str, column_name: &str) -> Vec<String>;

    /// Statements transforming a column definition from `old` to `new`.
    fn column_update_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        old: &ColumnModel,
        new: &ColumnModel,
    ) -> Result<Vec<String>>;

    /// Statements adding the primary key constraint.
    fn primary_key_add_sql(&self, owner: Option<&str>, table: &str, keys: &[String]) -> Vec<String>;

    /// Statements dropping the primary key constraint.
    fn primary_key_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String>;

    /// Statements creating an index.
    fn index_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        index: &IndexModel,
    ) -> Result<Vec<String>>;

    /// Statements dropping an index.
    fn index_drop_sql(&self, owner: Option<&str>, table: &str, index_name: &str) -> Vec<String>;

    /// One combined multi-row INSERT for a batch.
    ///
    /// Missing row values render as NULL. `render` selects bound
    /// placeholders (execution) or inline literals (display/export).
    fn insert_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        columns: &[ColumnModel],
        rows: &[Row],
        render: SqlRender,
    ) -> Result<SqlStatement>;

    /// SELECT over the listed columns with filters and ordering.
    fn select_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        columns: &[ColumnModel],
        wheres: &[Where],
        orders: &[Order],
        render: SqlRender,
    ) -> Result<SqlStatement>;

    /// Wrap a query with the engine's pagination syntax.
    fn page_sql(&self, sql: &str, page: &Page) -> String;
}

/// A pooled database connection.
///
/// One instance represents a pool authenticated for a specific
/// (credentials, owner) pair, because many engines scope authorization
/// and default-schema context to the connection itself.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute statements in order, optionally inside one transaction.
    ///
    /// Returns total rows affected. A failure carries the offending
    /// statement text and bound parameters in the error.
    async fn exec_batch(&self, statements: &[SqlStatement], transactional: bool) -> Result<u64>;

    /// Run a query and return one page of rows plus the total row count.
    async fn query_page(&self, statement: &SqlStatement, page: &Page) -> Result<(Vec<Row>, i64)>;

    /// List owner/schema names visible to this connection.
    async fn owners(&self) -> Result<Vec<String>>;

    /// List tables under an owner (columns/indexes may be elided).
    async fn tables(&self, owner: &str) -> Result<Vec<TableModel>>;

    /// Full metadata for one table, or None when absent.
    async fn table_detail(&self, owner: &str, table: &str) -> Result<Option<TableModel>>;

    /// Close the pool. Idempotent.
    async fn close(&self);
}

/// Opens pooled connections; the factory side of the driver boundary.
#[async_trait]
pub trait ConnectionOpener: Send + Sync {
    /// Open a pool for the config, authenticated as `username`/`password`,
    /// with `owner` as the session's default schema.
    async fn open(
        &self,
        config: &DatabaseConfig,
        username: &str,
        password: &str,
        owner: &str,
    ) -> Result<Arc<dyn Connection>>;
}
