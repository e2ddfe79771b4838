//! Schema diff compiler.
//!
//! Turns a desired-vs-current table definition ([`UpdateTableParam`]) into
//! the ordered, dialect-correct DDL sequence that transforms one into the
//! other. The compiler only decides which operations are necessary and in
//! what order; all statement text comes from the target [`Dialect`].

use std::collections::HashSet;

use crate::config::StatementOptions;
use crate::core::schema::UpdateTableParam;
use crate::core::traits::Dialect;
use crate::core::value::SqlStatement;
use crate::error::Result;

/// Compile the DDL sequence for a table update.
///
/// Statement order: column drops/adds/modifies in input order, then the
/// primary-key change (drop before add), then index changes in input order.
/// Unchanged columns and indexes emit nothing; an empty column list still
/// runs the primary-key and index logic.
pub fn table_update_sql(
    dialect: &dyn Dialect,
    options: &StatementOptions,
    owner: &str,
    table: &str,
    update: &UpdateTableParam,
) -> Result<Vec<SqlStatement>> {
    let owner = if options.qualify_owner && !owner.is_empty() {
        Some(owner)
    } else {
        None
    };

    // Derive the positional insert-after chain from list order. Each entry
    // points at the previous entry, deleted or not.
    let mut columns = update.columns.clone();
    let mut last_name: Option<String> = None;
    for entry in &mut columns {
        if let Some(prev) = &last_name {
            entry.column.after_column = Some(prev.clone());
        }
        last_name = Some(entry.column.name.clone());
    }

    let mut statements: Vec<SqlStatement> = Vec::new();
    let mut new_primary_keys: Vec<String> = Vec::new();
    let mut old_primary_keys: Vec<String> = Vec::new();

    for entry in &columns {
        if entry.column.primary_key {
            new_primary_keys.push(entry.column.name.clone());
        }
        if let Some(old) = &entry.old_column {
            if old.primary_key {
                old_primary_keys.push(old.name.clone());
            }
        }

        if entry.deleted {
            if let Some(old) = &entry.old_column {
                push_all(
                    &mut statements,
                    dialect.column_drop_sql(owner, table, &old.name),
                );
            }
        } else if entry.old_column.is_none() {
            push_all(
                &mut statements,
                dialect.column_add_sql(owner, table, &entry.column)?,
            );
        } else if let Some(old) = &entry.old_column {
            if !old.same_definition(&entry.column) {
                push_all(
                    &mut statements,
                    dialect.column_update_sql(owner, table, old, &entry.column)?,
                );
            }
        }
    }

    if primary_key_changed(&old_primary_keys, &new_primary_keys) {
        if !old_primary_keys.is_empty() {
            push_all(&mut statements, dialect.primary_key_drop_sql(owner, table));
        }
        if !new_primary_keys.is_empty() {
            push_all(
                &mut statements,
                dialect.primary_key_add_sql(owner, table, &new_primary_keys),
            );
        }
    }

    for entry in &update.indexes {
        if entry.deleted {
            if let Some(old) = &entry.old_index {
                push_all(
                    &mut statements,
                    dialect.index_drop_sql(owner, table, &old.name),
                );
            }
        } else if entry.old_index.is_none() {
            push_all(
                &mut statements,
                dialect.index_add_sql(owner, table, &entry.index)?,
            );
        } else if let Some(old) = &entry.old_index {
            // Column order is significant, so the lists compare joined.
            let changed = entry.index.name != old.name
                || entry.index.index_type != old.index_type
                || entry.index.comment != old.comment
                || entry.index.columns.join(",") != old.columns.join(",");
            if changed {
                push_all(
                    &mut statements,
                    dialect.index_drop_sql(owner, table, &old.name),
                );
                push_all(
                    &mut statements,
                    dialect.index_add_sql(owner, table, &entry.index)?,
                );
            }
        }
    }

    Ok(statements)
}

fn push_all(statements: &mut Vec<SqlStatement>, sql_list: Vec<String>) {
    statements.extend(sql_list.into_iter().map(SqlStatement::new));
}

/// Primary-key change: the symmetric difference of the name sets is
/// non-empty. Empty-to-empty and equal-but-reordered both count as
/// unchanged.
fn primary_key_changed(old: &[String], new: &[String]) -> bool {
    let old_set: HashSet<&String> = old.iter().collect();
    let new_set: HashSet<&String> = new.iter().collect();
    old_set != new_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnModel, IndexModel, UpdateTableColumn, UpdateTableIndex};
    use crate::dialect::DialectImpl;

    fn mysql() -> DialectImpl {
        DialectImpl::from_db_type("mysql").expect("mysql dialect")
    }

    fn options() -> StatementOptions {
        StatementOptions::default()
    }

    fn make_column(name: &str, data_type: &str, primary_key: bool) -> ColumnModel {
        ColumnModel {
            name: name.to_string(),
            data_type: data_type.to_string(),
            primary_key,
            ..Default::default()
        }
    }

    fn unchanged(column: ColumnModel) -> UpdateTableColumn {
        UpdateTableColumn {
            old_column: Some(column.clone()),
            column,
            deleted: false,
        }
    }

    fn compile(update: &UpdateTableParam) -> Vec<String> {
        table_update_sql(&mysql(), &options(), "app", "orders", update)
            .expect("compile")
            .into_iter()
            .map(|s| s.sql)
            .collect()
    }

    #[test]
    fn test_identical_definitions_emit_nothing() {
        let update = UpdateTableParam {
            columns: vec![
                unchanged(make_column("id", "bigint", true)),
                unchanged(make_column("status", "varchar", false)),
            ],
            indexes: vec![UpdateTableIndex {
                index: IndexModel {
                    name: "ix_status".to_string(),
                    columns: vec!["status".to_string()],
                    ..Default::default()
                },
                old_index: Some(IndexModel {
                    name: "ix_status".to_string(),
                    columns: vec!["status".to_string()],
                    ..Default::default()
                }),
                deleted: false,
            }],
            ..Default::default()
        };
        assert!(compile(&update).is_empty());
    }

    #[test]
    fn test_added_column_emits_single_add() {
        let update = UpdateTableParam {
            columns: vec![
                unchanged(make_column("id", "bigint", true)),
                UpdateTableColumn {
                    column: make_column("region", "varchar", false),
                    old_column: None,
                    deleted: false,
                },
            ],
            ..Default::default()
        };
        let statements = compile(&update);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("ADD COLUMN `region`"));
        // Positional hint derived from list order.
        assert!(statements[0].contains("AFTER `id`"));
    }

    #[test]
    fn test_pk_superset_adds_without_drop() {
        // Old PK set is empty, new is {id}: add only, no drop to emit.
        let update = UpdateTableParam {
            columns: vec![UpdateTableColumn {
                old_column: Some(make_column("id", "bigint", false)),
                column: make_column("id", "bigint", true),
                deleted: false,
            }],
            ..Default::default()
        };
        let statements = compile(&update);
        let drops = statements.iter().filter(|s| s.contains("DROP PRIMARY KEY")).count();
        let adds = statements.iter().filter(|s| s.contains("ADD PRIMARY KEY")).count();
        assert_eq!(drops, 0);
        assert_eq!(adds, 1);
    }

    #[test]
    fn test_pk_reordered_is_no_change() {
        let update = UpdateTableParam {
            columns: vec![
                UpdateTableColumn {
                    column: make_column("tenant_id", "bigint", true),
                    old_column: Some(make_column("id", "bigint", true)),
                    deleted: false,
                },
                UpdateTableColumn {
                    column: make_column("id", "bigint", true),
                    old_column: Some(make_column("tenant_id", "bigint", true)),
                    deleted: false,
                },
            ],
            ..Default::default()
        };
        let statements = compile(&update);
        assert!(
            !statements.iter().any(|s| s.contains("PRIMARY KEY")),
            "reordered-equal PK sets must not emit PK statements: {:?}",
            statements
        );
    }

    #[test]
    fn test_index_column_order_change_drops_then_adds() {
        let old = IndexModel {
            name: "ix_ab".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let new = IndexModel {
            name: "ix_ab".to_string(),
            columns: vec!["b".to_string(), "a".to_string()],
            ..Default::default()
        };
        let update = UpdateTableParam {
            indexes: vec![UpdateTableIndex {
                index: new,
                old_index: Some(old),
                deleted: false,
            }],
            ..Default::default()
        };
        let statements = compile(&update);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("DROP INDEX"));
        assert!(statements[1].contains("CREATE INDEX"));
    }

    #[test]
    fn test_empty_column_list_still_processes_indexes() {
        let update = UpdateTableParam {
            indexes: vec![UpdateTableIndex {
                index: IndexModel::default(),
                old_index: Some(IndexModel {
                    name: "ix_old".to_string(),
                    ..Default::default()
                }),
                deleted: true,
            }],
            ..Default::default()
        };
        let statements = compile(&update);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("DROP INDEX"));
        assert!(!statements.iter().any(|s| s.contains("PRIMARY KEY")));
    }

    #[test]
    fn test_statement_order_for_mixed_update() {
        // orders(id PK, status): drop status, add region, promote the
        // existing tenant_id into the key.
        let update = UpdateTableParam {
            columns: vec![
                unchanged(make_column("id", "bigint", true)),
                UpdateTableColumn {
                    column: ColumnModel::default(),
                    old_column: Some(make_column("status", "varchar", false)),
                    deleted: true,
                },
                UpdateTableColumn {
                    column: make_column("region", "varchar", false),
                    old_column: None,
                    deleted: false,
                },
                UpdateTableColumn {
                    column: make_column("tenant_id", "bigint", true),
                    old_column: Some(make_column("tenant_id", "bigint", false)),
                    deleted: false,
                },
            ],
            ..Default::default()
        };
        let statements = compile(&update);
        assert_eq!(statements.len(), 4, "{:?}", statements);
        assert!(statements[0].contains("DROP COLUMN `status`"));
        assert!(statements[1].contains("ADD COLUMN `region`"));
        assert!(statements[2].contains("DROP PRIMARY KEY"));
        assert!(statements[3].contains("ADD PRIMARY KEY (`id`, `tenant_id`)"));
    }

    #[test]
    fn test_pk_drop_precedes_add() {
        let update = UpdateTableParam {
            columns: vec![
                unchanged(make_column("id", "bigint", true)),
                UpdateTableColumn {
                    column: make_column("tenant_id", "bigint", true),
                    old_column: None,
                    deleted: false,
                },
            ],
            ..Default::default()
        };
        let statements = compile(&update);
        let drop_pos = statements.iter().position(|s| s.contains("DROP PRIMARY KEY"));
        let add_pos = statements.iter().position(|s| s.contains("ADD PRIMARY KEY"));
        assert!(drop_pos.is_some() && add_pos.is_some());
        assert!(drop_pos < add_pos);
        assert!(statements[add_pos.unwrap()].contains("`id`, `tenant_id`"));
    }
}
