//! Service facade bound to one source connection.
//!
//! A `Service` owns the source config, its dialect, and one pooled source
//! connection. Schema inspection and paged browsing run on that
//! connection; DDL execution opens short-lived per-owner work pools; the
//! long-running operations launch through the injected [`TaskRegistry`]
//! and open their own pools via a [`PoolManager`].

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::config::{DatabaseConfig, SqlRender, StatementOptions};
use crate::core::schema::{ColumnModel, TableModel, UpdateTableParam};
use crate::core::traits::{Connection, ConnectionOpener, Dialect, Order, Where};
use crate::core::value::{Page, SqlStatement};
use crate::dialect::DialectImpl;
use crate::diff;
use crate::error::{DbError, Result};
use crate::pool::PoolManager;
use crate::project::{project_rows, DataPage};
use crate::task::execute::{execute_script, run_execute, ExecuteParam, StatementResult};
use crate::task::export::{run_export, ExportParam};
use crate::task::generate::{run_generate, GenerateParam};
use crate::task::import::{run_import, ImportParam};
use crate::task::sync::{run_sync, SyncParam};
use crate::task::{launch_task, TaskKind, TaskRegistry, TaskSnapshot};

/// Facade over one source database.
pub struct Service {
    config: DatabaseConfig,
    dialect: DialectImpl,
    conn: Arc<dyn Connection>,
    opener: Arc<dyn ConnectionOpener>,
    registry: Arc<TaskRegistry>,
}

impl Service {
    /// Connect to the configured database and build a service around it.
    pub async fn connect(
        config: DatabaseConfig,
        opener: Arc<dyn ConnectionOpener>,
        registry: Arc<TaskRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let dialect = DialectImpl::from_db_type(&config.kind)?;
        let conn = opener
            .open(&config, &config.username, &config.password, &config.owner)
            .await?;
        info!("service connected to {} ({})", config.host, dialect.kind());
        Ok(Self {
            config,
            dialect,
            conn,
            opener,
            registry,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// Close the source connection.
    pub async fn stop(&self) {
        self.conn.close().await;
    }

    /// The dialect generated SQL targets: an override from the options, or
    /// the source connection's own.
    pub fn target_dialect(&self, options: &StatementOptions) -> Result<DialectImpl> {
        match &options.target_kind {
            Some(kind) if !kind.is_empty() => DialectImpl::from_db_type(kind),
            _ => Ok(self.dialect.clone()),
        }
    }

    // ===== Introspection =====

    pub async fn owners(&self) -> Result<Vec<String>> {
        self.conn.owners().await
    }

    pub async fn tables(&self, owner: &str) -> Result<Vec<TableModel>> {
        self.conn.tables(owner).await
    }

    pub async fn table_detail(&self, owner: &str, table: &str) -> Result<Option<TableModel>> {
        self.conn.table_detail(owner, table).await
    }

    // ===== DDL generation =====

    /// Generate create-DDL for one table, or for every table under the
    /// owner when `table` is None.
    pub async fn ddl(
        &self,
        options: &StatementOptions,
        owner: &str,
        table: Option<&str>,
    ) -> Result<Vec<String>> {
        let target = self.target_dialect(options)?;
        let mut sql_list = Vec::new();

        if options.include_owner_create {
            sql_list.extend(target.owner_create_sql(owner));
        }

        let tables = match table {
            Some(name) => match self.conn.table_detail(owner, name).await? {
                Some(detail) => vec![detail],
                None => Vec::new(),
            },
            None => {
                let mut details = Vec::new();
                for table in self.conn.tables(owner).await? {
                    match self.conn.table_detail(owner, &table.table_name).await? {
                        Some(detail) => details.push(detail),
                        None => details.push(table),
                    }
                }
                details
            }
        };

        let owner_q = if options.qualify_owner { Some(owner) } else { None };
        for table in &tables {
            sql_list.extend(target.table_create_sql(owner_q, table)?);
        }
        Ok(sql_list)
    }

    /// Compile the DDL sequence for a table update without executing it.
    pub fn table_update_sql(
        &self,
        options: &StatementOptions,
        owner: &str,
        table: &str,
        update: &UpdateTableParam,
    ) -> Result<Vec<SqlStatement>> {
        let target = self.target_dialect(options)?;
        diff::table_update_sql(&target, options, owner, table, update)
    }

    // ===== DDL execution (per-owner work pools) =====

    /// Compile and apply a table update.
    pub async fn table_update(
        &self,
        options: &StatementOptions,
        owner: &str,
        table: &str,
        update: &UpdateTableParam,
    ) -> Result<()> {
        let statements = self.table_update_sql(options, owner, table, update)?;
        self.with_work_db(options, owner, |conn| async move {
            conn.exec_batch(&statements, false).await?;
            Ok(())
        })
        .await
    }

    /// Create a table under an owner.
    pub async fn table_create(
        &self,
        options: &StatementOptions,
        owner: &str,
        table: &TableModel,
    ) -> Result<()> {
        let owner_q = if options.qualify_owner { Some(owner) } else { None };
        let statements: Vec<SqlStatement> = self
            .dialect
            .table_create_sql(owner_q, table)?
            .into_iter()
            .map(SqlStatement::new)
            .collect();
        self.with_work_db(options, owner, |conn| async move {
            conn.exec_batch(&statements, false).await?;
            Ok(())
        })
        .await
    }

    /// Drop a table.
    pub async fn table_delete(
        &self,
        options: &StatementOptions,
        owner: &str,
        table: &str,
    ) -> Result<()> {
        let owner_q = if options.qualify_owner { Some(owner) } else { None };
        let statements: Vec<SqlStatement> = self
            .dialect
            .table_drop_sql(owner_q, table)
            .into_iter()
            .map(SqlStatement::new)
            .collect();
        self.with_work_db(options, owner, |conn| async move {
            conn.exec_batch(&statements, false).await?;
            Ok(())
        })
        .await
    }

    /// Delete all rows of one table.
    pub async fn table_data_trim(&self, owner: &str, table: &str) -> Result<()> {
        let sql = format!("DELETE FROM {}", self.dialect.owner_table(Some(owner), table));
        self.conn
            .exec_batch(&[SqlStatement::new(sql)], false)
            .await?;
        Ok(())
    }

    /// Delete all rows of every table under an owner.
    pub async fn owner_data_trim(&self, owner: &str) -> Result<()> {
        for table in self.conn.tables(owner).await? {
            self.table_data_trim(owner, &table.table_name).await?;
        }
        Ok(())
    }

    // ===== Data browsing =====

    /// Fetch one page of table data, projected for transport.
    pub async fn table_data(
        &self,
        owner: &str,
        table: &str,
        columns: &[ColumnModel],
        wheres: &[Where],
        orders: &[Order],
        page: Page,
    ) -> Result<DataPage> {
        let select =
            self.dialect
                .select_sql(Some(owner), table, columns, wheres, orders, SqlRender::Bind)?;
        let display =
            self.dialect
                .select_sql(Some(owner), table, columns, wheres, orders, SqlRender::Inline)?;

        let (rows, total) = self.conn.query_page(&select, &page).await?;
        Ok(DataPage {
            sql: self.dialect.page_sql(&display.sql, &page),
            args: select.params,
            total,
            rows: project_rows(columns, rows),
        })
    }

    // ===== Script execution =====

    /// Run a SQL script synchronously against a per-owner work pool.
    ///
    /// Returns the per-statement results and, when execution halted early,
    /// the fatal error's text.
    pub async fn execute_sql(
        &self,
        param: ExecuteParam,
    ) -> Result<(Vec<StatementResult>, Option<String>)> {
        let options = param.options.clone();
        let owner = param.owner.clone();
        self.with_work_db(&options, &owner, |conn| async move {
            let (results, fatal) = execute_script(&conn, &param, None).await;
            Ok((results, fatal.map(|e| e.to_string())))
        })
        .await
    }

    // ===== Task launchers =====

    /// Launch an export task. Returns the registered task's snapshot.
    pub async fn start_export(&self, param: ExportParam) -> Result<TaskSnapshot> {
        let target = self.target_dialect(&param.options)?;
        let conn = self.conn.clone();
        launch_task(&self.registry, TaskKind::Export, move |handle| {
            run_export(conn, target, param, handle)
        })
        .await
    }

    /// Launch an import task against this service's database.
    pub async fn start_import(&self, param: ImportParam) -> Result<TaskSnapshot> {
        let pools = Arc::new(PoolManager::new(self.config.clone(), self.opener.clone()));
        launch_task(&self.registry, TaskKind::Import, move |handle| {
            run_import(pools, param, handle)
        })
        .await
    }

    /// Launch a sync task from this service's database into the target
    /// config carried by the parameters.
    pub async fn start_sync(&self, param: SyncParam) -> Result<TaskSnapshot> {
        param.target_config.validate()?;
        let target_dialect = DialectImpl::from_db_type(&param.target_config.kind)?;
        let target_pools = Arc::new(PoolManager::new(
            param.target_config.clone(),
            self.opener.clone(),
        ));
        let source = self.conn.clone();
        let source_dialect = self.dialect.clone();
        launch_task(&self.registry, TaskKind::Sync, move |handle| {
            run_sync(source, source_dialect, target_pools, target_dialect, param, handle)
        })
        .await
    }

    /// Launch a script-execution task.
    pub async fn start_execute(&self, param: ExecuteParam) -> Result<TaskSnapshot> {
        let pools = Arc::new(PoolManager::new(self.config.clone(), self.opener.clone()));
        launch_task(&self.registry, TaskKind::Execute, move |handle| async move {
            let conn = pools
                .acquire(
                    param.options.exec_username.as_deref(),
                    param.options.exec_password.as_deref(),
                    &param.owner,
                )
                .await;
            let result = match conn {
                Ok(conn) => run_execute(conn, param, handle).await,
                Err(err) => Err(err),
            };
            pools.close_all().await;
            result
        })
        .await
    }

    /// Launch a scripted data-generation task.
    pub async fn start_generate(&self, param: GenerateParam) -> Result<TaskSnapshot> {
        let dialect = self.target_dialect(&param.options)?;
        let pools = Arc::new(PoolManager::new(self.config.clone(), self.opener.clone()));
        launch_task(&self.registry, TaskKind::Generate, move |handle| {
            run_generate(pools, dialect, param, handle)
        })
        .await
    }

    // ===== Task polling =====

    pub fn task_status(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.registry.get(task_id)
    }

    pub fn stop_task(&self, task_id: &str) -> bool {
        self.registry.stop(task_id)
    }

    pub fn clean_task(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.registry.clean(task_id)
    }

    /// Open a work pool for an owner, run `work`, and close the pool on
    /// every path.
    async fn with_work_db<F, Fut, T>(
        &self,
        options: &StatementOptions,
        owner: &str,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (username, password) = options.credentials(&self.config);
        let conn = self
            .opener
            .open(&self.config, username, password, owner)
            .await
            .map_err(|err| {
                DbError::connection(err.to_string(), format!("work pool for owner {}", owner))
            })?;
        let result = work(conn.clone()).await;
        conn.close().await;
        result
    }
}
