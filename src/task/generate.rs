//! Scripted bulk-data generation ("strategy import").
//!
//! Each strategy row is a template for a batch of rows sharing the same
//! column-expression shape: per target column either a literal value or an
//! expression evaluated in a per-row scope. The scope is seeded with the
//! row index, and column values computed earlier in a row are visible to
//! later expressions, so columns can derive from one another. Rows
//! accumulate into batches that flush as one combined insert.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{SqlRender, StatementOptions};
use crate::core::schema::ColumnModel;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{CellValue, Row};
use crate::dialect::DialectImpl;
use crate::error::Result;
use crate::pool::PoolManager;
use crate::script::ScriptEngine;
use crate::task::{TaskCallbacks, TaskHandle};

/// Rows per flush when the parameter leaves it unset.
const DEFAULT_BATCH_SIZE: usize = 10;

/// Per-column seed within a strategy row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSeed {
    /// Use this value as-is for every generated row.
    Literal(CellValue),
    /// Evaluate this expression per row. An empty expression behaves like
    /// an empty-string literal.
    Script(String),
}

/// One data-shape template and how many rows to synthesize from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRow {
    /// Requested row count; non-positive counts synthesize nothing.
    pub count: i64,

    /// Column seeds in insertion order. Keys that match no target column
    /// are ignored.
    pub seeds: IndexMap<String, ColumnSeed>,
}

/// Parameters for a generation task.
#[derive(Clone)]
pub struct GenerateParam {
    /// Target owner/schema.
    pub owner: String,

    /// Target table.
    pub table: String,

    /// Target column definitions.
    pub columns: Vec<ColumnModel>,

    /// Strategy rows, processed in order.
    pub strategies: Vec<StrategyRow>,

    /// Rows per flush; 0 selects the default of 10.
    pub batch_size: usize,

    pub options: StatementOptions,
    pub callbacks: TaskCallbacks,
}

/// Generation worker body.
pub(crate) async fn run_generate(
    pools: Arc<PoolManager>,
    dialect: DialectImpl,
    param: GenerateParam,
    handle: TaskHandle,
) -> Result<()> {
    let result = generate_strategies(&pools, &dialect, &param, &handle).await;
    pools.close_all().await;
    result
}

async fn generate_strategies(
    pools: &Arc<PoolManager>,
    dialect: &DialectImpl,
    param: &GenerateParam,
    handle: &TaskHandle,
) -> Result<()> {
    // Plan the full data count up front so pollers see the target early.
    for strategy in &param.strategies {
        handle.add_total(strategy.count.max(0));
    }

    let conn = pools
        .acquire(
            param.options.exec_username.as_deref(),
            param.options.exec_password.as_deref(),
            &param.owner,
        )
        .await?;

    let engine = ScriptEngine::new();
    for strategy in &param.strategies {
        if handle.is_cancelled() {
            break;
        }
        generate_strategy(&conn, dialect, param, handle, &engine, strategy).await?;
    }
    Ok(())
}

async fn generate_strategy(
    conn: &Arc<dyn Connection>,
    dialect: &DialectImpl,
    param: &GenerateParam,
    handle: &TaskHandle,
    engine: &ScriptEngine,
    strategy: &StrategyRow,
) -> Result<()> {
    if strategy.count <= 0 {
        return Ok(());
    }
    let batch_size = if param.batch_size == 0 {
        DEFAULT_BATCH_SIZE
    } else {
        param.batch_size
    };

    // Only columns this strategy seeds participate in the insert; seed keys
    // matching no target column are dropped.
    let columns: Vec<ColumnModel> = param
        .columns
        .iter()
        .filter(|c| strategy.seeds.contains_key(&c.name))
        .cloned()
        .collect();

    let mut batch: Vec<Row> = Vec::with_capacity(batch_size);
    for i in 0..strategy.count {
        if handle.is_cancelled() {
            return Ok(());
        }

        let mut scope = engine.new_scope();
        scope.set("index", &CellValue::Int(i));

        let mut row = Row::new();
        for column in &columns {
            let seed = match strategy.seeds.get(&column.name) {
                Some(seed) => seed,
                None => continue,
            };
            let value = match seed {
                ColumnSeed::Literal(value) => value.clone(),
                ColumnSeed::Script(expr) if expr.trim().is_empty() => {
                    CellValue::Text(String::new())
                }
                // Evaluation failure aborts the whole task: later rows may
                // depend on earlier scripted state.
                ColumnSeed::Script(expr) => scope.eval(expr)?,
            };
            scope.set(&column.name, &value);
            row.insert(column.name.clone(), value);
        }
        handle.add_ready(1);
        batch.push(row);

        if batch.len() >= batch_size {
            if handle.is_cancelled() {
                return Ok(());
            }
            flush_batch(conn, dialect, param, handle, &columns, &mut batch).await?;
        }
    }

    if handle.is_cancelled() {
        return Ok(());
    }
    flush_batch(conn, dialect, param, handle, &columns, &mut batch).await
}

async fn flush_batch(
    conn: &Arc<dyn Connection>,
    dialect: &DialectImpl,
    param: &GenerateParam,
    handle: &TaskHandle,
    columns: &[ColumnModel],
    batch: &mut Vec<Row>,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let owner_q = if param.options.qualify_owner {
        Some(param.owner.as_str())
    } else {
        None
    };
    let count = batch.len() as i64;
    let insert = dialect.insert_sql(owner_q, &param.table, columns, batch, SqlRender::Bind)?;
    match conn
        .exec_batch(std::slice::from_ref(&insert), param.options.open_transaction)
        .await
    {
        Ok(_) => {
            handle.add_success(count);
            batch.clear();
            param.callbacks.progress(handle);
            Ok(())
        }
        Err(err) => {
            // The whole batch counts as failed, and the failure halts the
            // task rather than skipping ahead.
            handle.add_error(count);
            Err(err)
        }
    }
}
