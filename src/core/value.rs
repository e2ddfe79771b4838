//! Typed cell values and statement types shared across the engine.
//!
//! Rows are an ordered column-name → value association; dialects turn them
//! into DML and the projector turns them into transport-safe strings.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single database value.
///
/// The union covers what paged browsing and scripted generation produce:
/// string, number, boolean, null, and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Render as a SQL literal for inline statement text.
    ///
    /// String escaping doubles single quotes; this is for generated
    /// display/export SQL, not a substitute for bind parameters.
    pub fn to_sql_literal(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Bool(v) => {
                if *v {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Decimal(v) => v.to_string(),
            CellValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
            CellValue::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }

    /// Render as a plain display string (no quoting).
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => format!("{:.6}", v),
            CellValue::Decimal(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
            CellValue::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        CellValue::Decimal(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::DateTime(v)
    }
}

/// The zero-time sentinel some drivers report for absent timestamps.
pub fn zero_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

/// One row: ordered column-name → value association.
pub type Row = IndexMap<String, CellValue>;

/// A SQL statement with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<CellValue>,
}

impl SqlStatement {
    /// Create a statement without bound parameters (DDL, inline DML).
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Create a statement with bound parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<CellValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bound parameters rendered for error messages and logs.
    pub fn params_display(&self) -> String {
        serde_json::to_string(&self.params).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Page request for paged browsing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    /// Rows per page.
    pub page_size: usize,
    /// 1-based page number.
    pub page_no: usize,
}

impl Page {
    pub fn new(page_size: usize, page_no: usize) -> Self {
        Self {
            page_size,
            page_no: page_no.max(1),
        }
    }

    /// Row offset of the first row on this page.
    pub fn offset(&self) -> usize {
        (self.page_no - 1) * self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_literals() {
        assert_eq!(CellValue::Null.to_sql_literal(), "NULL");
        assert_eq!(CellValue::Int(42).to_sql_literal(), "42");
        assert_eq!(CellValue::Bool(true).to_sql_literal(), "1");
        assert_eq!(
            CellValue::Text("O'Brien".to_string()).to_sql_literal(),
            "'O''Brien'"
        );

        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).to_sql_literal(),
            "'2024-03-01 09:30:00'"
        );
    }

    #[test]
    fn test_display_string_fixed_float() {
        assert_eq!(CellValue::Float(1.5).display_string(), "1.500000");
        assert_eq!(CellValue::Int(9_007_199_254_740_993).display_string(), "9007199254740993");
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::new(10, 1).offset(), 0);
        assert_eq!(Page::new(10, 3).offset(), 20);
        // Page numbers clamp to 1
        assert_eq!(Page::new(10, 0).offset(), 0);
    }

    #[test]
    fn test_statement_params_display() {
        let stmt = SqlStatement::with_params(
            "INSERT INTO t (a) VALUES (?)",
            vec![CellValue::Int(1), CellValue::Text("x".to_string())],
        );
        assert_eq!(stmt.params_display(), r#"[1,"x"]"#);
    }
}
