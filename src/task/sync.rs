//! Sync task: replicate owners/tables from the source connection into a
//! second database, producing target-dialect DDL and DML while reading
//! from the source.
//!
//! The task owns a [`PoolManager`] bound to the *target* config and needs
//! both dialects live at once: the source connection reads pages, the
//! target dialect renders everything that executes on the target pools.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{DatabaseConfig, SqlRender, StatementOptions};
use crate::core::identifier::format_index_name;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{Page, SqlStatement};
use crate::dialect::DialectImpl;
use crate::error::{DbError, Result};
use crate::pool::PoolManager;
use crate::task::{TaskCallbacks, TaskHandle};

/// Parameters for a sync task.
#[derive(Clone)]
pub struct SyncParam {
    pub owners: Vec<SyncOwner>,

    /// Target database descriptor.
    pub target_config: DatabaseConfig,

    /// Rows per read page.
    pub page_size: usize,

    /// Drop and recreate target tables before copying.
    pub recreate_tables: bool,

    pub options: StatementOptions,
    pub callbacks: TaskCallbacks,
}

/// One owner mapping within a sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOwner {
    pub source_name: String,

    /// Target owner; falls back to the source name.
    #[serde(default)]
    pub target_name: Option<String>,

    /// Credential overrides for the target pool.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Tables to sync; empty means all tables under the source owner.
    #[serde(default)]
    pub tables: Vec<SyncTable>,
}

/// One table mapping within a sync owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTable {
    pub source_name: String,
    #[serde(default)]
    pub target_name: Option<String>,
}

/// Sync worker body.
pub(crate) async fn run_sync(
    source: Arc<dyn Connection>,
    source_dialect: DialectImpl,
    target_pools: Arc<PoolManager>,
    target_dialect: DialectImpl,
    param: SyncParam,
    handle: TaskHandle,
) -> Result<()> {
    let ctx = SyncCtx {
        source,
        source_dialect,
        target_dialect,
    };
    let result = sync_owners(&ctx, &target_pools, &param, &handle).await;
    target_pools.close_all().await;
    result
}

/// Everything a sync table copy needs besides its parameters: the source
/// connection with its dialect, and the dialect everything target-side is
/// rendered in.
struct SyncCtx {
    source: Arc<dyn Connection>,
    source_dialect: DialectImpl,
    target_dialect: DialectImpl,
}

async fn sync_owners(
    ctx: &SyncCtx,
    target_pools: &Arc<PoolManager>,
    param: &SyncParam,
    handle: &TaskHandle,
) -> Result<()> {
    for owner in &param.owners {
        if handle.is_cancelled() {
            break;
        }
        let target_owner = owner
            .target_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| owner.source_name.clone());
        let target_conn = target_pools
            .acquire(owner.username.as_deref(), owner.password.as_deref(), &target_owner)
            .await?;

        let mappings: Vec<(String, String)> = if owner.tables.is_empty() {
            ctx.source
                .tables(&owner.source_name)
                .await?
                .into_iter()
                .map(|t| (t.table_name.clone(), t.table_name))
                .collect()
        } else {
            owner
                .tables
                .iter()
                .map(|t| {
                    let target = t
                        .target_name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| t.source_name.clone());
                    (t.source_name.clone(), target)
                })
                .collect()
        };
        handle.add_total(mappings.len() as i64);

        for (source_table, target_table) in &mappings {
            if handle.is_cancelled() {
                break;
            }
            let result = sync_table(
                ctx,
                &target_conn,
                param,
                handle,
                owner,
                &target_owner,
                source_table,
                target_table,
            )
            .await;
            match result {
                Ok(()) => {
                    handle.add_success(1);
                    param.callbacks.progress(handle);
                }
                Err(err) if param.options.continue_on_error => {
                    handle.add_error(1);
                    param.callbacks.error(&err);
                }
                Err(err) => {
                    handle.add_error(1);
                    return Err(err);
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn sync_table(
    ctx: &SyncCtx,
    target_conn: &Arc<dyn Connection>,
    param: &SyncParam,
    handle: &TaskHandle,
    owner: &SyncOwner,
    target_owner: &str,
    source_table: &str,
    target_table: &str,
) -> Result<()> {
    let target_dialect = &ctx.target_dialect;
    let mut table = ctx
        .source
        .table_detail(&owner.source_name, source_table)
        .await?
        .ok_or_else(|| {
            DbError::Config(format!(
                "table {}.{} not found on source",
                owner.source_name, source_table
            ))
        })?;
    table.table_name = target_table.to_string();
    for index in &mut table.indexes {
        index.name = format_index_name(
            target_owner,
            target_table,
            index,
            param.options.format_index_name,
            target_dialect.max_identifier_length(),
        );
    }

    let owner_q = if param.options.qualify_owner {
        Some(target_owner)
    } else {
        None
    };

    let mut ddl: Vec<SqlStatement> = Vec::new();
    if param.recreate_tables {
        ddl.extend(
            target_dialect
                .table_drop_sql(owner_q, target_table)
                .into_iter()
                .map(SqlStatement::new),
        );
    }
    ddl.extend(
        target_dialect
            .table_create_sql(owner_q, &table)?
            .into_iter()
            .map(SqlStatement::new),
    );
    target_conn.exec_batch(&ddl, false).await?;

    // The page reads run on the source connection, so the source dialect
    // renders them; everything executed on the target uses the target's.
    let select = ctx.source_dialect.select_sql(
        Some(owner.source_name.as_str()),
        source_table,
        &table.columns,
        &[],
        &[],
        SqlRender::Bind,
    )?;

    let mut page_no = 1usize;
    loop {
        if handle.is_cancelled() {
            break;
        }
        let page = Page::new(param.page_size, page_no);
        let (rows, _total) = ctx.source.query_page(&select, &page).await?;
        if rows.is_empty() {
            break;
        }
        let row_count = rows.len();
        handle.add_ready(row_count as i64);

        if handle.is_cancelled() {
            break;
        }
        let insert =
            target_dialect.insert_sql(owner_q, target_table, &table.columns, &rows, SqlRender::Bind)?;
        target_conn
            .exec_batch(std::slice::from_ref(&insert), param.options.open_transaction)
            .await?;

        if row_count < param.page_size {
            break;
        }
        page_no += 1;
    }
    Ok(())
}
