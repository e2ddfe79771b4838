//! Result projector: normalizes raw query rows into transport-safe,
//! dialect-agnostic values for paged browsing.

use serde::{Deserialize, Serialize};

use crate::core::schema::ColumnModel;
use crate::core::value::{zero_time, CellValue, Row};

/// One page of browsed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPage {
    /// Display form of the executed query: inline-rendered values, wrapped
    /// with the dialect's pagination syntax.
    pub sql: String,

    /// Bound parameters of the query that actually ran.
    pub args: Vec<CellValue>,

    /// Total row count reported by the driver.
    pub total: i64,

    /// Projected rows.
    pub rows: Vec<Row>,
}

/// Normalize raw rows for transport.
///
/// Values whose column name is not in `columns` (compared
/// case-insensitively) are dropped. Kept values become strings: floats with
/// fixed six-decimal formatting, 64-bit integers as decimal strings, the
/// zero-time sentinel as null. Nulls pass through.
pub fn project_rows(columns: &[ColumnModel], rows: Vec<Row>) -> Vec<Row> {
    let known: Vec<String> = columns.iter().map(|c| c.name.to_lowercase()).collect();

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .filter(|(name, _)| known.contains(&name.to_lowercase()))
                .map(|(name, value)| (name, project_value(value)))
                .collect()
        })
        .collect()
}

fn project_value(value: CellValue) -> CellValue {
    match value {
        CellValue::Null => CellValue::Null,
        CellValue::DateTime(v) if v == zero_time() => CellValue::Null,
        other => CellValue::Text(other.display_string()),
    }
}
