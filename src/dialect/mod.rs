//! SQL dialect implementations.
//!
//! Each module implements the [`Dialect`] strategy for one engine.
//! [`DialectImpl`] wraps them in one enum so the supported engine set is
//! visible in one place and dialects stay cheaply cloneable values.

pub mod mysql;
pub mod oracle;
pub mod postgres;

pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;

use crate::config::SqlRender;
use crate::core::schema::{ColumnModel, IndexModel, TableModel};
use crate::core::traits::{Dialect, Order, Where};
use crate::core::value::{CellValue, Page, Row, SqlStatement};
use crate::error::{DbError, Result};

/// Enum wrapper over the supported dialect implementations.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Oracle(OracleDialect),
}

impl DialectImpl {
    /// Create a dialect implementation from a database kind string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database kind is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "oracle" => Ok(DialectImpl::Oracle(OracleDialect::new())),
            other => Err(DbError::Config(format!(
                "Unknown database kind: '{}'. Supported kinds: mysql, postgres, oracle",
                other
            ))),
        }
    }

    fn inner(&self) -> &dyn Dialect {
        match self {
            DialectImpl::Mysql(d) => d,
            DialectImpl::Postgres(d) => d,
            DialectImpl::Oracle(d) => d,
        }
    }
}

impl Dialect for DialectImpl {
    fn kind(&self) -> &str {
        self.inner().kind()
    }

    fn quote_ident(&self, name: &str) -> String {
        self.inner().quote_ident(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        self.inner().param_placeholder(index)
    }

    fn max_identifier_length(&self) -> Option<usize> {
        self.inner().max_identifier_length()
    }

    fn value_literal(&self, value: &CellValue) -> String {
        self.inner().value_literal(value)
    }

    fn column_type_sql(&self, column: &ColumnModel) -> Result<String> {
        self.inner().column_type_sql(column)
    }

    fn owner_create_sql(&self, owner: &str) -> Vec<String> {
        self.inner().owner_create_sql(owner)
    }

    fn table_create_sql(&self, owner: Option<&str>, table: &TableModel) -> Result<Vec<String>> {
        self.inner().table_create_sql(owner, table)
    }

    fn table_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String> {
        self.inner().table_drop_sql(owner, table)
    }

    fn column_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        column: &ColumnModel,
    ) -> Result<Vec<String>> {
        self.inner().column_add_sql(owner, table, column)
    }

    fn column_drop_sql(&self, owner: Option<&str>, table: &str, column_name: &str) -> Vec<String> {
        self.inner().column_drop_sql(owner, table, column_name)
    }

    fn column_update_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        old: &ColumnModel,
        new: &ColumnModel,
    ) -> Result<Vec<String>> {
        self.inner().column_update_sql(owner, table, old, new)
    }

    fn primary_key_add_sql(&self, owner: Option<&str>, table: &str, keys: &[String]) -> Vec<String> {
        self.inner().primary_key_add_sql(owner, table, keys)
    }

    fn primary_key_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String> {
        self.inner().primary_key_drop_sql(owner, table)
    }

    fn index_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        index: &IndexModel,
    ) -> Result<Vec<String>> {
        self.inner().index_add_sql(owner, table, index)
    }

    fn index_drop_sql(&self, owner: Option<&str>, table: &str, index_name: &str) -> Vec<String> {
        self.inner().index_drop_sql(owner, table, index_name)
    }

    fn insert_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        columns: &[ColumnModel],
        rows: &[Row],
        render: SqlRender,
    ) -> Result<SqlStatement> {
        self.inner().insert_sql(owner, table, columns, rows, render)
    }

    fn select_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        columns: &[ColumnModel],
        wheres: &[Where],
        orders: &[Order],
        render: SqlRender,
    ) -> Result<SqlStatement> {
        self.inner()
            .select_sql(owner, table, columns, wheres, orders, render)
    }

    fn page_sql(&self, sql: &str, page: &Page) -> String {
        self.inner().page_sql(sql, page)
    }
}

/// Render a default-value expression.
///
/// Numeric literals and function-style defaults pass through; everything
/// else is quoted as a string literal.
pub(crate) fn default_value_sql(default: &str) -> String {
    let trimmed = default.trim();
    let numeric = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    let function_like = trimmed.to_uppercase().starts_with("CURRENT_") || trimmed.ends_with("()");
    if numeric || function_like {
        trimmed.to_string()
    } else {
        format!("'{}'", trimmed.replace('\'', "''"))
    }
}

/// The index name a CREATE INDEX statement uses: the model's name, or a
/// deterministic fallback derived from the table and column list.
pub(crate) fn effective_index_name(table: &str, index: &IndexModel) -> String {
    if !index.name.is_empty() {
        return index.name.clone();
    }
    format!("{}_{}", table, index.columns.join("_"))
}

/// Shared multi-row INSERT builder (`VALUES (...), (...)` form).
pub(crate) fn build_insert(
    dialect: &dyn Dialect,
    owner: Option<&str>,
    table: &str,
    columns: &[ColumnModel],
    rows: &[Row],
    render: SqlRender,
) -> Result<SqlStatement> {
    if columns.is_empty() {
        return Err(DbError::Dialect(format!(
            "insert into {} requires at least one column",
            table
        )));
    }

    let col_list: Vec<String> = columns.iter().map(|c| dialect.quote_ident(&c.name)).collect();
    let mut tuples = Vec::with_capacity(rows.len());
    let mut params = Vec::new();
    let mut index = 1usize;

    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let value = row.get(&column.name).cloned().unwrap_or(CellValue::Null);
            match render {
                SqlRender::Inline => values.push(dialect.value_literal(&value)),
                SqlRender::Bind => {
                    values.push(dialect.param_placeholder(index));
                    index += 1;
                    params.push(value);
                }
            }
        }
        tuples.push(format!("({})", values.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        dialect.owner_table(owner, table),
        col_list.join(", "),
        tuples.join(", ")
    );
    Ok(SqlStatement::with_params(sql, params))
}

/// Shared SELECT builder with filters and ordering.
pub(crate) fn build_select(
    dialect: &dyn Dialect,
    owner: Option<&str>,
    table: &str,
    columns: &[ColumnModel],
    wheres: &[Where],
    orders: &[Order],
    render: SqlRender,
) -> Result<SqlStatement> {
    let cols = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| dialect.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {} FROM {}", cols, dialect.owner_table(owner, table));
    let mut params = Vec::new();

    if !wheres.is_empty() {
        let mut conditions = Vec::with_capacity(wheres.len());
        for (i, clause) in wheres.iter().enumerate() {
            let rhs = match render {
                SqlRender::Inline => dialect.value_literal(&clause.value),
                SqlRender::Bind => {
                    params.push(clause.value.clone());
                    dialect.param_placeholder(i + 1)
                }
            };
            conditions.push(format!(
                "{} {} {}",
                dialect.quote_ident(&clause.column),
                clause.operator.to_uppercase(),
                rhs
            ));
        }
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if !orders.is_empty() {
        let terms: Vec<String> = orders
            .iter()
            .map(|o| {
                format!(
                    "{}{}",
                    dialect.quote_ident(&o.column),
                    if o.desc { " DESC" } else { "" }
                )
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    Ok(SqlStatement::with_params(sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_db_type() {
        assert_eq!(DialectImpl::from_db_type("mysql").unwrap().kind(), "mysql");
        assert_eq!(DialectImpl::from_db_type("PostgreSQL").unwrap().kind(), "postgres");
        assert_eq!(DialectImpl::from_db_type("oracle").unwrap().kind(), "oracle");
        assert!(DialectImpl::from_db_type("sqlite").is_err());
    }

    #[test]
    fn test_default_value_sql() {
        assert_eq!(default_value_sql("0"), "0");
        assert_eq!(default_value_sql("-1.5"), "-1.5");
        assert_eq!(default_value_sql("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(default_value_sql("now()"), "now()");
        assert_eq!(default_value_sql("pending"), "'pending'");
    }

    fn make_columns() -> Vec<ColumnModel> {
        vec![
            ColumnModel {
                name: "id".to_string(),
                data_type: "bigint".to_string(),
                ..Default::default()
            },
            ColumnModel {
                name: "name".to_string(),
                data_type: "varchar".to_string(),
                length: 50,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_build_insert_bind_vs_inline() {
        let dialect = DialectImpl::from_db_type("postgres").unwrap();
        let mut row = Row::new();
        row.insert("id".to_string(), CellValue::Int(7));
        row.insert("name".to_string(), CellValue::Text("it's".to_string()));
        let columns = make_columns();

        let bound = dialect
            .insert_sql(Some("app"), "users", &columns, &[row.clone()], SqlRender::Bind)
            .unwrap();
        assert_eq!(
            bound.sql,
            "INSERT INTO \"app\".\"users\" (\"id\", \"name\") VALUES ($1, $2)"
        );
        assert_eq!(bound.params.len(), 2);

        let inline = dialect
            .insert_sql(Some("app"), "users", &columns, &[row], SqlRender::Inline)
            .unwrap();
        assert!(inline.sql.ends_with("VALUES (7, 'it''s')"));
        assert!(inline.params.is_empty());
    }

    #[test]
    fn test_build_insert_missing_value_renders_null() {
        let dialect = DialectImpl::from_db_type("mysql").unwrap();
        let mut row = Row::new();
        row.insert("id".to_string(), CellValue::Int(1));
        let stmt = dialect
            .insert_sql(None, "users", &make_columns(), &[row], SqlRender::Inline)
            .unwrap();
        assert!(stmt.sql.ends_with("VALUES (1, NULL)"));
    }

    #[test]
    fn test_build_select_with_filters() {
        let dialect = DialectImpl::from_db_type("mysql").unwrap();
        let wheres = vec![Where {
            column: "status".to_string(),
            operator: "=".to_string(),
            value: CellValue::Text("open".to_string()),
        }];
        let orders = vec![Order {
            column: "id".to_string(),
            desc: true,
        }];
        let stmt = dialect
            .select_sql(None, "orders", &make_columns(), &wheres, &orders, SqlRender::Bind)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `id`, `name` FROM `orders` WHERE `status` = ? ORDER BY `id` DESC"
        );
        assert_eq!(stmt.params, vec![CellValue::Text("open".to_string())]);
    }
}
