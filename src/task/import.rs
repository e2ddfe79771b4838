//! Import task: execute previously exported SQL files against per-owner
//! pooled connections.
//!
//! Each target owner gets its own pool (with optional credential
//! overrides); every pool the task opened is closed together in one
//! cleanup step at task end, regardless of which owner failed.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::StatementOptions;
use crate::core::sqltext::split_sql_statements;
use crate::core::value::SqlStatement;
use crate::error::Result;
use crate::pool::PoolManager;
use crate::task::{TaskCallbacks, TaskHandle};

/// Parameters for an import task.
#[derive(Clone)]
pub struct ImportParam {
    pub owners: Vec<ImportOwner>,

    /// Statements per exec batch.
    pub batch_size: usize,

    pub options: StatementOptions,
    pub callbacks: TaskCallbacks,
}

/// One target owner within an import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOwner {
    pub name: String,

    /// Credential overrides for this owner's pool.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    pub tables: Vec<ImportTable>,
}

/// One SQL file to import into a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTable {
    pub name: String,
    pub path: PathBuf,
}

/// Import worker body.
pub(crate) async fn run_import(
    pools: Arc<PoolManager>,
    param: ImportParam,
    handle: TaskHandle,
) -> Result<()> {
    let result = import_owners(&pools, &param, &handle).await;
    pools.close_all().await;
    result
}

async fn import_owners(
    pools: &Arc<PoolManager>,
    param: &ImportParam,
    handle: &TaskHandle,
) -> Result<()> {
    let batch_size = param.batch_size.max(1);

    for owner in &param.owners {
        if handle.is_cancelled() {
            break;
        }
        let conn = pools
            .acquire(owner.username.as_deref(), owner.password.as_deref(), &owner.name)
            .await?;

        for table in &owner.tables {
            if handle.is_cancelled() {
                break;
            }
            let content = std::fs::read_to_string(&table.path)?;
            let statements: Vec<SqlStatement> = split_sql_statements(&content)
                .into_iter()
                .map(SqlStatement::new)
                .collect();
            handle.add_total(statements.len() as i64);

            for batch in statements.chunks(batch_size) {
                if handle.is_cancelled() {
                    break;
                }
                handle.add_ready(batch.len() as i64);
                match conn.exec_batch(batch, param.options.open_transaction).await {
                    Ok(_) => {
                        handle.add_success(batch.len() as i64);
                        param.callbacks.progress(handle);
                    }
                    Err(err) if param.options.continue_on_error => {
                        handle.add_error(batch.len() as i64);
                        param.callbacks.error(&err);
                    }
                    Err(err) => {
                        handle.add_error(batch.len() as i64);
                        return Err(err);
                    }
                }
            }
        }
    }
    Ok(())
}
