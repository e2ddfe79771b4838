//! PostgreSQL SQL dialect.

use crate::config::SqlRender;
use crate::core::schema::{ColumnModel, IndexModel, TableModel};
use crate::core::traits::{Dialect, Order, Where};
use crate::core::value::{CellValue, Page, Row, SqlStatement};
use crate::error::Result;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }

    fn column_def(&self, column: &ColumnModel) -> Result<String> {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type_sql(column)?
        );
        if column.not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(&super::default_value_sql(default));
        }
        Ok(def)
    }

    fn column_comment_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        column: &str,
        comment: &str,
    ) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS '{}'",
            self.owner_table(owner, table),
            self.quote_ident(column),
            comment.replace('\'', "''")
        )
    }

    /// Index names are schema-scoped objects in PostgreSQL.
    fn index_ref(&self, owner: Option<&str>, index_name: &str) -> String {
        match owner {
            Some(o) if !o.is_empty() => {
                format!("{}.{}", self.quote_ident(o), self.quote_ident(index_name))
            }
            _ => self.quote_ident(index_name),
        }
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn value_literal(&self, value: &CellValue) -> String {
        match value {
            CellValue::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            other => other.to_sql_literal(),
        }
    }

    fn column_type_sql(&self, column: &ColumnModel) -> Result<String> {
        let sql = match column.data_type.to_lowercase().as_str() {
            "varchar" | "char" => format!("VARCHAR({})", column.length.max(1)),
            "int" | "integer" => "INTEGER".to_string(),
            "bigint" => "BIGINT".to_string(),
            "smallint" => "SMALLINT".to_string(),
            "text" | "clob" => "TEXT".to_string(),
            "datetime" | "timestamp" => "TIMESTAMP".to_string(),
            "date" => "DATE".to_string(),
            "decimal" | "numeric" | "number" => {
                if column.precision > 0 {
                    format!("NUMERIC({},{})", column.precision, column.scale.max(0))
                } else {
                    "NUMERIC".to_string()
                }
            }
            "double" | "float" => "DOUBLE PRECISION".to_string(),
            "boolean" | "bool" => "BOOLEAN".to_string(),
            "blob" | "binary" => "BYTEA".to_string(),
            other => other.to_uppercase(),
        };
        Ok(sql)
    }

    fn owner_create_sql(&self, owner: &str) -> Vec<String> {
        vec![format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.quote_ident(owner)
        )]
    }

    fn table_create_sql(&self, owner: Option<&str>, table: &TableModel) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for column in &table.columns {
            lines.push(format!("  {}", self.column_def(column)?));
        }
        let keys = table.primary_keys();
        if !keys.is_empty() {
            let quoted: Vec<String> = keys.iter().map(|k| self.quote_ident(k)).collect();
            lines.push(format!("  PRIMARY KEY ({})", quoted.join(", ")));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.owner_table(owner, &table.table_name),
            lines.join(",\n")
        )];

        if !table.comment.is_empty() {
            statements.push(format!(
                "COMMENT ON TABLE {} IS '{}'",
                self.owner_table(owner, &table.table_name),
                table.comment.replace('\'', "''")
            ));
        }
        for column in &table.columns {
            if !column.comment.is_empty() {
                statements.push(self.column_comment_sql(
                    owner,
                    &table.table_name,
                    &column.name,
                    &column.comment,
                ));
            }
        }
        for index in &table.indexes {
            statements.extend(self.index_add_sql(owner, &table.table_name, index)?);
        }
        Ok(statements)
    }

    fn table_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String> {
        vec![format!("DROP TABLE IF EXISTS {}", self.owner_table(owner, table))]
    }

    fn column_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        column: &ColumnModel,
    ) -> Result<Vec<String>> {
        // PostgreSQL has no positional ADD COLUMN; the ordering hint is ignored.
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.owner_table(owner, table),
            self.column_def(column)?
        )];
        if !column.comment.is_empty() {
            statements.push(self.column_comment_sql(owner, table, &column.name, &column.comment));
        }
        Ok(statements)
    }

    fn column_drop_sql(&self, owner: Option<&str>, table: &str, column_name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.owner_table(owner, table),
            self.quote_ident(column_name)
        )]
    }

    fn column_update_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        old: &ColumnModel,
        new: &ColumnModel,
    ) -> Result<Vec<String>> {
        let table_ref = self.owner_table(owner, table);
        let mut statements = Vec::new();

        if old.name != new.name {
            statements.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                table_ref,
                self.quote_ident(&old.name),
                self.quote_ident(&new.name)
            ));
        }
        let type_changed = old.data_type != new.data_type
            || old.length != new.length
            || old.precision != new.precision
            || old.scale != new.scale;
        if type_changed {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table_ref,
                self.quote_ident(&new.name),
                self.column_type_sql(new)?
            ));
        }
        if old.not_null != new.not_null {
            let action = if new.not_null { "SET" } else { "DROP" };
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
                table_ref,
                self.quote_ident(&new.name),
                action
            ));
        }
        if old.default_value != new.default_value {
            match &new.default_value {
                Some(default) => statements.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    table_ref,
                    self.quote_ident(&new.name),
                    super::default_value_sql(default)
                )),
                None => statements.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                    table_ref,
                    self.quote_ident(&new.name)
                )),
            }
        }
        if old.comment != new.comment {
            statements.push(self.column_comment_sql(owner, table, &new.name, &new.comment));
        }
        Ok(statements)
    }

    fn primary_key_add_sql(&self, owner: Option<&str>, table: &str, keys: &[String]) -> Vec<String> {
        let quoted: Vec<String> = keys.iter().map(|k| self.quote_ident(k)).collect();
        vec![format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.owner_table(owner, table),
            quoted.join(", ")
        )]
    }

    fn primary_key_drop_sql(&self, owner: Option<&str>, table: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.owner_table(owner, table),
            self.quote_ident(&format!("{}_pkey", table))
        )]
    }

    fn index_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        index: &IndexModel,
    ) -> Result<Vec<String>> {
        let name = super::effective_index_name(table, index);
        let unique = if index.index_type.eq_ignore_ascii_case("unique") {
            "UNIQUE "
        } else {
            ""
        };
        let cols: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote_ident(&name),
            self.owner_table(owner, table),
            cols.join(", ")
        )])
    }

    fn index_drop_sql(&self, owner: Option<&str>, _table: &str, index_name: &str) -> Vec<String> {
        vec![format!("DROP INDEX {}", self.index_ref(owner, index_name))]
    }

    fn insert_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        columns: &[ColumnModel],
        rows: &[Row],
        render: SqlRender,
    ) -> Result<SqlStatement> {
        super::build_insert(self, owner, table, columns, rows, render)
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
        super::build_select(self, owner, table, columns, wheres, orders, render)
    }

    fn page_sql(&self, sql: &str, page: &Page) -> String {
        format!("{} LIMIT {} OFFSET {}", sql, page.page_size, page.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_and_placeholder() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("orders"), "\"orders\"");
        assert_eq!(dialect.param_placeholder(2), "$2");
    }

    #[test]
    fn test_primary_key_drop_uses_constraint_name() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.primary_key_drop_sql(Some("app"), "orders"),
            vec!["ALTER TABLE \"app\".\"orders\" DROP CONSTRAINT \"orders_pkey\""]
        );
    }

    #[test]
    fn test_column_update_emits_only_changed_aspects() {
        let dialect = PostgresDialect::new();
        let old = ColumnModel {
            name: "status".to_string(),
            data_type: "varchar".to_string(),
            length: 16,
            ..Default::default()
        };
        let new = ColumnModel {
            length: 64,
            not_null: true,
            ..old.clone()
        };
        let statements = dialect.column_update_sql(None, "orders", &old, &new).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("TYPE VARCHAR(64)"));
        assert!(statements[1].contains("SET NOT NULL"));
    }

    #[test]
    fn test_page_sql() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.page_sql("SELECT 1", &Page::new(25, 2)),
            "SELECT 1 LIMIT 25 OFFSET 25"
        );
    }
}
