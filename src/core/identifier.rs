//! Deterministic, length-bounded naming for generated identifiers.
//!
//! Some dialects cap identifier length (Oracle: 30 characters). Generated
//! index names are built from owner/table/type/columns and must shrink to
//! the cap deterministically, so that recomputing the name from the same
//! inputs on a later re-sync yields the same result and does not mark an
//! unchanged index as changed.

use crate::core::schema::IndexModel;

/// Shrink an identifier to `max_len` characters.
///
/// Names within the budget are returned unchanged. Underscore-delimited
/// names allocate the budget proportionally across segments
/// (`max_len / segment_count`), reserving one character per non-final
/// segment for the trailing underscore; names without a delimiter are
/// hard-truncated. Pure and deterministic.
pub fn shrink_identifier(name: &str, max_len: usize) -> String {
    let name = name.trim();
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    if !name.contains('_') {
        return name.chars().take(max_len).collect();
    }

    let parts: Vec<&str> = name.split('_').collect();
    let segment_count = parts.iter().filter(|s| !s.trim().is_empty()).count().max(1);
    let budget = max_len / segment_count;
    let last = parts.len() - 1;

    let mut res = String::new();
    for (i, part) in parts.iter().enumerate() {
        if res.chars().count() >= max_len {
            break;
        }
        let part_len = part.chars().count();
        if i < last {
            if budget as i64 >= part_len as i64 - 1 {
                res.push_str(part);
            } else {
                res.extend(part.chars().take(budget.saturating_sub(1)));
            }
            res.push('_');
        } else if budget >= part_len {
            res.push_str(part);
        } else {
            res.extend(part.chars().take(budget));
        }
    }

    res.chars().take(max_len).collect()
}

/// Build the name for a generated index.
///
/// An index that already carries a name keeps it unless `force` asks for
/// regeneration. Generated names concatenate owner, table, index type
/// (omitted when empty or "index"), and the column list, underscore-joined,
/// then shrink to `max_len` when the target dialect caps identifiers.
pub fn format_index_name(
    owner: &str,
    table: &str,
    index: &IndexModel,
    force: bool,
    max_len: Option<usize>,
) -> String {
    if !index.name.is_empty() && !force {
        return index.name.clone();
    }

    let mut name = String::new();
    if !owner.is_empty() {
        name.push_str(owner);
        name.push('_');
    }
    if !table.is_empty() {
        name.push_str(table);
        name.push('_');
    }
    if !index.index_type.is_empty() && !index.index_type.eq_ignore_ascii_case("index") {
        name.push_str(&index.index_type);
        name.push('_');
    }
    name.push_str(&index.columns.join("_"));

    match max_len {
        Some(max) => shrink_identifier(&name, max),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shrink_under_budget_unchanged() {
        assert_eq!(shrink_identifier("orders_status_idx", 30), "orders_status_idx");
        assert_eq!(shrink_identifier("id", 30), "id");
        assert_eq!(shrink_identifier("  padded  ", 30), "padded");
    }

    #[test]
    fn test_shrink_bounded_and_order_preserved() {
        let name = "warehouse_inventory_movement_unique_item_location";
        let shrunk = shrink_identifier(name, 30);
        assert!(shrunk.chars().count() <= 30, "got {:?}", shrunk);

        // Every emitted segment is a prefix of its source segment, in order.
        let sources: Vec<&str> = name.split('_').collect();
        for (i, seg) in shrunk.split('_').enumerate() {
            assert!(sources[i].starts_with(seg), "{:?} not prefix of {:?}", seg, sources[i]);
        }
    }

    #[test]
    fn test_shrink_no_delimiter_hard_truncates() {
        let name = "averyverylongidentifierwithoutseparators";
        assert_eq!(shrink_identifier(name, 10), "averyveryl");
    }

    #[test]
    fn test_shrink_deterministic_and_idempotent() {
        let name = "app_orders_unique_tenant_id_created_at";
        let once = shrink_identifier(name, 30);
        assert_eq!(once, shrink_identifier(name, 30));
        assert_eq!(shrink_identifier(&once, 30), once);
    }

    fn make_index(name: &str, index_type: &str, columns: &[&str]) -> IndexModel {
        IndexModel {
            name: name.to_string(),
            index_type: index_type.to_string(),
            comment: String::new(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_format_keeps_existing_name() {
        let index = make_index("ix_orders_status", "index", &["status"]);
        assert_eq!(
            format_index_name("app", "orders", &index, false, Some(30)),
            "ix_orders_status"
        );
    }

    #[test]
    fn test_format_generates_name() {
        let index = make_index("", "unique", &["tenant_id", "code"]);
        assert_eq!(
            format_index_name("app", "orders", &index, false, None),
            "app_orders_unique_tenant_id_code"
        );

        // "index" type is omitted from the generated name
        let index = make_index("", "index", &["status"]);
        assert_eq!(
            format_index_name("app", "orders", &index, false, None),
            "app_orders_status"
        );
    }

    #[test]
    fn test_format_forced_regeneration_shrinks() {
        let index = make_index("existing", "unique", &["tenant_id", "created_at"]);
        let name = format_index_name("warehouse", "inventory_movement", &index, true, Some(30));
        assert_ne!(name, "existing");
        assert!(name.chars().count() <= 30);
    }
}
