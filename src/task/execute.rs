//! Raw SQL execution: split a script into statements, run them in order,
//! and collect per-statement results.
//!
//! Used synchronously by [`Service::execute_sql`](crate::service::Service)
//! and asynchronously as a launched task, where the result list lands in
//! the task's extend object.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::StatementOptions;
use crate::core::sqltext::{is_query_statement, split_sql_statements};
use crate::core::traits::Connection;
use crate::core::value::{Page, Row, SqlStatement};
use crate::error::{DbError, Result};
use crate::task::{TaskCallbacks, TaskHandle};

/// Parameters for script execution.
#[derive(Clone)]
pub struct ExecuteParam {
    /// Owner/schema the statements run under.
    pub owner: String,

    /// The script text; statements separated by semicolons.
    pub sql_content: String,

    /// Row cap for query statements.
    pub page_size: usize,

    pub options: StatementOptions,
    pub callbacks: TaskCallbacks,
}

/// Outcome of one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementResult {
    pub sql: String,
    pub is_query: bool,
    pub rows_affected: u64,
    /// Result rows for query statements (capped at `page_size`).
    pub rows: Vec<Row>,
    /// Total count the driver reported for query statements.
    pub total: i64,
    pub error: Option<String>,
}

/// Run a script statement by statement.
///
/// Returns the per-statement results and, when a failure halted execution
/// (continue-on-error unset), the fatal error. Query statements never open
/// a transaction; write statements are wrapped individually when the
/// options ask for one.
pub(crate) async fn execute_script(
    conn: &Arc<dyn Connection>,
    param: &ExecuteParam,
    handle: Option<&TaskHandle>,
) -> (Vec<StatementResult>, Option<DbError>) {
    let statements = split_sql_statements(&param.sql_content);
    if let Some(handle) = handle {
        handle.add_total(statements.len() as i64);
    }

    let mut results = Vec::with_capacity(statements.len());
    for sql in statements {
        if let Some(handle) = handle {
            if handle.is_cancelled() {
                break;
            }
            handle.add_ready(1);
        }

        let outcome = run_statement(conn, param, &sql).await;
        match outcome {
            Ok(result) => {
                if let Some(handle) = handle {
                    handle.add_success(1);
                }
                results.push(result);
                if let Some(handle) = handle {
                    param.callbacks.progress(handle);
                }
            }
            Err(err) => {
                if let Some(handle) = handle {
                    handle.add_error(1);
                }
                results.push(StatementResult {
                    sql: sql.clone(),
                    is_query: is_query_statement(&sql),
                    rows_affected: 0,
                    rows: Vec::new(),
                    total: 0,
                    error: Some(err.to_string()),
                });
                if param.options.continue_on_error {
                    param.callbacks.error(&err);
                } else {
                    return (results, Some(err));
                }
            }
        }
    }
    (results, None)
}

async fn run_statement(
    conn: &Arc<dyn Connection>,
    param: &ExecuteParam,
    sql: &str,
) -> Result<StatementResult> {
    let statement = SqlStatement::new(sql);
    if is_query_statement(sql) {
        let page = Page::new(param.page_size.max(1), 1);
        let (rows, total) = conn.query_page(&statement, &page).await?;
        Ok(StatementResult {
            sql: sql.to_string(),
            is_query: true,
            rows_affected: 0,
            rows,
            total,
            error: None,
        })
    } else {
        let rows_affected = conn
            .exec_batch(std::slice::from_ref(&statement), param.options.open_transaction)
            .await?;
        Ok(StatementResult {
            sql: sql.to_string(),
            is_query: false,
            rows_affected,
            rows: Vec::new(),
            total: 0,
            error: None,
        })
    }
}

/// Execute worker body for the launched-task form.
pub(crate) async fn run_execute(
    conn: Arc<dyn Connection>,
    param: ExecuteParam,
    handle: TaskHandle,
) -> Result<()> {
    let (results, fatal) = execute_script(&conn, &param, Some(&handle)).await;
    handle.set_extend("executeList", serde_json::to_value(&results)?);
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
