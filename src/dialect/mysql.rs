//! MySQL SQL dialect.

use crate::config::SqlRender;
use crate::core::schema::{ColumnModel, IndexModel, TableModel};
use crate::core::traits::{Dialect, Order, Where};
use crate::core::value::{Page, Row, SqlStatement};
use crate::error::Result;

/// MySQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
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
        if !column.comment.is_empty() {
            def.push_str(&format!(" COMMENT '{}'", column.comment.replace('\'', "''")));
        }
        Ok(def)
    }
}

impl Dialect for MysqlDialect {
    fn kind(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type_sql(&self, column: &ColumnModel) -> Result<String> {
        let sql = match column.data_type.to_lowercase().as_str() {
            "varchar" | "char" => format!("VARCHAR({})", column.length.max(1)),
            "int" | "integer" => "INT".to_string(),
            "bigint" => "BIGINT".to_string(),
            "smallint" => "SMALLINT".to_string(),
            "text" | "clob" => "TEXT".to_string(),
            "datetime" | "timestamp" => "DATETIME".to_string(),
            "date" => "DATE".to_string(),
            "decimal" | "numeric" | "number" => {
                if column.precision > 0 {
                    format!("DECIMAL({},{})", column.precision, column.scale.max(0))
                } else {
                    "DECIMAL".to_string()
                }
            }
            "double" | "float" => "DOUBLE".to_string(),
            "boolean" | "bool" => "TINYINT(1)".to_string(),
            "blob" | "binary" => "BLOB".to_string(),
            other => other.to_uppercase(),
        };
        Ok(sql)
    }

    fn owner_create_sql(&self, owner: &str) -> Vec<String> {
        vec![format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET utf8mb4",
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

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.owner_table(owner, &table.table_name),
            lines.join(",\n")
        );
        if !table.comment.is_empty() {
            sql.push_str(&format!(" COMMENT='{}'", table.comment.replace('\'', "''")));
        }

        let mut statements = vec![sql];
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
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.owner_table(owner, table),
            self.column_def(column)?
        );
        if let Some(after) = &column.after_column {
            sql.push_str(&format!(" AFTER {}", self.quote_ident(after)));
        }
        Ok(vec![sql])
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
        let sql = if old.name != new.name {
            format!(
                "ALTER TABLE {} CHANGE COLUMN {} {}",
                self.owner_table(owner, table),
                self.quote_ident(&old.name),
                self.column_def(new)?
            )
        } else {
            format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                self.owner_table(owner, table),
                self.column_def(new)?
            )
        };
        Ok(vec![sql])
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
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.owner_table(owner, table)
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

    fn index_drop_sql(&self, owner: Option<&str>, table: &str, index_name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.owner_table(owner, table),
            self.quote_ident(index_name)
        )]
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
        format!("{} LIMIT {}, {}", sql, page.offset(), page.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_and_placeholder() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("orders"), "`orders`");
        assert_eq!(dialect.quote_ident("a`b"), "`a``b`");
        assert_eq!(dialect.param_placeholder(3), "?");
    }

    #[test]
    fn test_column_add_with_position() {
        let dialect = MysqlDialect::new();
        let column = ColumnModel {
            name: "region".to_string(),
            data_type: "varchar".to_string(),
            length: 64,
            not_null: true,
            after_column: Some("status".to_string()),
            ..Default::default()
        };
        let sql = dialect.column_add_sql(Some("app"), "orders", &column).unwrap();
        assert_eq!(
            sql,
            vec!["ALTER TABLE `app`.`orders` ADD COLUMN `region` VARCHAR(64) NOT NULL AFTER `status`"]
        );
    }

    #[test]
    fn test_primary_key_statements() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.primary_key_drop_sql(None, "orders"),
            vec!["ALTER TABLE `orders` DROP PRIMARY KEY"]
        );
        assert_eq!(
            dialect.primary_key_add_sql(None, "orders", &["id".to_string(), "tenant_id".to_string()]),
            vec!["ALTER TABLE `orders` ADD PRIMARY KEY (`id`, `tenant_id`)"]
        );
    }

    #[test]
    fn test_page_sql() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.page_sql("SELECT * FROM `t`", &Page::new(20, 3)),
            "SELECT * FROM `t` LIMIT 40, 20"
        );
    }
}
