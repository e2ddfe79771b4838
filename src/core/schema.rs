//! Schema metadata types: tables, columns, indexes, and the table-update
//! parameter consumed by the diff compiler.

use serde::{Deserialize, Serialize};

/// Table metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableModel {
    /// Owning schema name.
    #[serde(default)]
    pub owner_name: String,

    /// Table name.
    pub table_name: String,

    /// Table comment.
    #[serde(default)]
    pub comment: String,

    /// Column definitions in positional order.
    #[serde(default)]
    pub columns: Vec<ColumnModel>,

    /// Index definitions.
    #[serde(default)]
    pub indexes: Vec<IndexModel>,
}

impl TableModel {
    /// Primary key column names in column order.
    pub fn primary_keys(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnModel {
    /// Column name.
    pub name: String,

    /// Canonical data type (e.g. "varchar", "bigint", "datetime").
    pub data_type: String,

    /// Length for string types (0 when not applicable).
    #[serde(default)]
    pub length: i32,

    /// Numeric precision.
    #[serde(default)]
    pub precision: i32,

    /// Numeric scale.
    #[serde(default)]
    pub scale: i32,

    /// Whether the column rejects NULL.
    #[serde(default)]
    pub not_null: bool,

    /// Default value expression, if any.
    #[serde(default)]
    pub default_value: Option<String>,

    /// Column comment.
    #[serde(default)]
    pub comment: String,

    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,

    /// Positional hint: the column this one is inserted after. Derived by
    /// the diff compiler from list order; dialects that support positional
    /// ADD COLUMN use it.
    #[serde(default)]
    pub after_column: Option<String>,
}

impl ColumnModel {
    /// Compare definitions, ignoring the positional ordering hint and the
    /// primary-key flag (key membership changes are compiled separately as
    /// PK drop/add statements).
    pub fn same_definition(&self, other: &ColumnModel) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.length == other.length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.not_null == other.not_null
            && self.default_value == other.default_value
            && self.comment == other.comment
    }
}

/// Index metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexModel {
    /// Index name (may be empty for generated indexes).
    #[serde(default)]
    pub name: String,

    /// Index type ("", "index", "unique", ...).
    #[serde(default)]
    pub index_type: String,

    /// Index comment.
    #[serde(default)]
    pub comment: String,

    /// Indexed column names, in order. Order is significant.
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Desired-vs-current table definition: the diff compiler's sole input.
///
/// A column with `old_column == None` is an add; `deleted == true` with a
/// present old column is a drop; both present and unequal is a modify.
/// Indexes follow the same convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTableParam {
    #[serde(default)]
    pub table_comment: String,

    #[serde(default)]
    pub old_table_comment: String,

    #[serde(default)]
    pub columns: Vec<UpdateTableColumn>,

    #[serde(default)]
    pub indexes: Vec<UpdateTableIndex>,
}

/// One column entry of an [`UpdateTableParam`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTableColumn {
    /// Desired column definition.
    #[serde(flatten)]
    pub column: ColumnModel,

    /// The current counterpart, if the column already exists.
    #[serde(default)]
    pub old_column: Option<ColumnModel>,

    /// Marked for removal.
    #[serde(default)]
    pub deleted: bool,
}

/// One index entry of an [`UpdateTableParam`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTableIndex {
    /// Desired index definition.
    #[serde(flatten)]
    pub index: IndexModel,

    /// The current counterpart, if the index already exists.
    #[serde(default)]
    pub old_index: Option<IndexModel>,

    /// Marked for removal.
    #[serde(default)]
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_column(name: &str, data_type: &str) -> ColumnModel {
        ColumnModel {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_primary_keys_in_column_order() {
        let table = TableModel {
            table_name: "orders".to_string(),
            columns: vec![
                ColumnModel {
                    primary_key: true,
                    ..make_column("id", "bigint")
                },
                make_column("status", "varchar"),
                ColumnModel {
                    primary_key: true,
                    ..make_column("tenant_id", "bigint")
                },
            ],
            ..Default::default()
        };
        assert_eq!(table.primary_keys(), vec!["id", "tenant_id"]);
    }

    #[test]
    fn test_same_definition_ignores_after_column() {
        let a = make_column("name", "varchar");
        let mut b = a.clone();
        b.after_column = Some("id".to_string());
        assert!(a.same_definition(&b));

        b.data_type = "text".to_string();
        assert!(!a.same_definition(&b));
    }
}
