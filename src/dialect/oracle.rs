//! Oracle SQL dialect.
//!
//! Oracle caps identifier length at 30 characters, which is what forces
//! generated index names through the shrinking namer.

use crate::config::SqlRender;
use crate::core::schema::{ColumnModel, IndexModel, TableModel};
use crate::core::traits::{Dialect, Order, Where};
use crate::core::value::{CellValue, Page, Row, SqlStatement};
use crate::error::Result;

/// Oracle dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

impl OracleDialect {
    pub fn new() -> Self {
        Self
    }

    fn column_def(&self, column: &ColumnModel) -> Result<String> {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type_sql(column)?
        );
        if let Some(default) = &column.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(&super::default_value_sql(default));
        }
        if column.not_null {
            def.push_str(" NOT NULL");
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

    fn index_ref(&self, owner: Option<&str>, index_name: &str) -> String {
        match owner {
            Some(o) if !o.is_empty() => {
                format!("{}.{}", self.quote_ident(o), self.quote_ident(index_name))
            }
            _ => self.quote_ident(index_name),
        }
    }
}

impl Dialect for OracleDialect {
    fn kind(&self) -> &str {
        "oracle"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(30)
    }

    fn value_literal(&self, value: &CellValue) -> String {
        match value {
            CellValue::DateTime(v) => format!(
                "TO_DATE('{}', 'YYYY-MM-DD HH24:MI:SS')",
                v.format("%Y-%m-%d %H:%M:%S")
            ),
            other => other.to_sql_literal(),
        }
    }

    fn column_type_sql(&self, column: &ColumnModel) -> Result<String> {
        let sql = match column.data_type.to_lowercase().as_str() {
            "varchar" | "char" => format!("VARCHAR2({})", column.length.max(1)),
            "int" | "integer" => "NUMBER(10)".to_string(),
            "bigint" => "NUMBER(19)".to_string(),
            "smallint" => "NUMBER(5)".to_string(),
            "text" | "clob" => "CLOB".to_string(),
            "datetime" | "timestamp" => "DATE".to_string(),
            "date" => "DATE".to_string(),
            "decimal" | "numeric" | "number" => {
                if column.precision > 0 {
                    format!("NUMBER({},{})", column.precision, column.scale.max(0))
                } else {
                    "NUMBER".to_string()
                }
            }
            "double" | "float" => "BINARY_DOUBLE".to_string(),
            "boolean" | "bool" => "NUMBER(1)".to_string(),
            "blob" | "binary" => "BLOB".to_string(),
            other => other.to_uppercase(),
        };
        Ok(sql)
    }

    fn owner_create_sql(&self, owner: &str) -> Vec<String> {
        vec![
            format!(
                "CREATE USER {} IDENTIFIED BY {}",
                self.quote_ident(owner),
                self.quote_ident(owner)
            ),
            format!("GRANT CONNECT, RESOURCE TO {}", self.quote_ident(owner)),
        ]
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
        vec![format!("DROP TABLE {}", self.owner_table(owner, table))]
    }

    fn column_add_sql(
        &self,
        owner: Option<&str>,
        table: &str,
        column: &ColumnModel,
    ) -> Result<Vec<String>> {
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD ({})",
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
        let def_changed = old.data_type != new.data_type
            || old.length != new.length
            || old.precision != new.precision
            || old.scale != new.scale
            || old.not_null != new.not_null
            || old.default_value != new.default_value;
        if def_changed {
            statements.push(format!(
                "ALTER TABLE {} MODIFY ({})",
                table_ref,
                self.column_def(new)?
            ));
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
        let name = crate::core::identifier::shrink_identifier(&name, 30);
        let unique = if index.index_type.eq_ignore_ascii_case("unique") {
            "UNIQUE "
        } else {
            ""
        };
        let cols: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.index_ref(owner, &name),
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
        if rows.len() <= 1 {
            return super::build_insert(self, owner, table, columns, rows, render);
        }

        // Multi-row inserts use INSERT ALL ... SELECT 1 FROM DUAL.
        let table_ref = self.owner_table(owner, table);
        let col_list: Vec<String> = columns.iter().map(|c| self.quote_ident(&c.name)).collect();
        let mut sql = String::from("INSERT ALL");
        let mut params = Vec::new();
        let mut index = 1usize;

        for row in rows {
            let mut values = Vec::with_capacity(columns.len());
            for column in columns {
                let value = row.get(&column.name).cloned().unwrap_or(CellValue::Null);
                match render {
                    SqlRender::Inline => values.push(self.value_literal(&value)),
                    SqlRender::Bind => {
                        values.push(self.param_placeholder(index));
                        index += 1;
                        params.push(value);
                    }
                }
            }
            sql.push_str(&format!(
                "\n  INTO {} ({}) VALUES ({})",
                table_ref,
                col_list.join(", "),
                values.join(", ")
            ));
        }
        sql.push_str("\nSELECT 1 FROM DUAL");
        Ok(SqlStatement::with_params(sql, params))
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
        let end = page.offset() + page.page_size;
        format!(
            "SELECT * FROM (SELECT __t.*, ROWNUM __rn FROM ({}) __t WHERE ROWNUM <= {}) WHERE __rn > {}",
            sql,
            end,
            page.offset()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_and_cap() {
        let dialect = OracleDialect::new();
        assert_eq!(dialect.param_placeholder(1), ":1");
        assert_eq!(dialect.max_identifier_length(), Some(30));
    }

    #[test]
    fn test_generated_index_name_is_shrunk() {
        let dialect = OracleDialect::new();
        let index = IndexModel {
            name: "warehouse_inventory_movement_unique_item_location".to_string(),
            index_type: "unique".to_string(),
            comment: String::new(),
            columns: vec!["item_id".to_string(), "location_id".to_string()],
        };
        let sql = dialect.index_add_sql(None, "inventory_movement", &index).unwrap();
        // The emitted index name stays within Oracle's 30-character cap.
        let name = sql[0]
            .split_whitespace()
            .nth(3)
            .unwrap()
            .trim_matches('"');
        assert!(name.chars().count() <= 30, "got {:?}", name);
    }

    #[test]
    fn test_insert_all_for_multi_row() {
        let dialect = OracleDialect::new();
        let columns = vec![
            ColumnModel {
                name: "id".to_string(),
                data_type: "bigint".to_string(),
                ..Default::default()
            },
        ];
        let mut row1 = Row::new();
        row1.insert("id".to_string(), CellValue::Int(1));
        let mut row2 = Row::new();
        row2.insert("id".to_string(), CellValue::Int(2));

        let stmt = dialect
            .insert_sql(None, "t", &columns, &[row1, row2], SqlRender::Bind)
            .unwrap();
        assert!(stmt.sql.starts_with("INSERT ALL"));
        assert!(stmt.sql.ends_with("SELECT 1 FROM DUAL"));
        assert!(stmt.sql.contains(":1") && stmt.sql.contains(":2"));
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_page_sql_rownum() {
        let dialect = OracleDialect::new();
        let sql = dialect.page_sql("SELECT * FROM \"t\"", &Page::new(10, 2));
        assert!(sql.contains("ROWNUM <= 20"));
        assert!(sql.contains("__rn > 10"));
    }
}
