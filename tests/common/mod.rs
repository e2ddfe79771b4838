//! Shared in-memory database mock implementing the driver seam.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dbtask::core::{Connection, ConnectionOpener};
use dbtask::error::{DbError, Result};
use dbtask::{DatabaseConfig, Page, Row, SqlStatement, TableModel};

/// Shared backing state for every connection the mock opener hands out.
#[derive(Default)]
pub struct MockState {
    tables: Mutex<HashMap<(String, String), TableModel>>,
    rows: Mutex<HashMap<(String, String), Vec<Row>>>,
    /// Every statement any connection executed, in order.
    pub executed: Mutex<Vec<SqlStatement>>,
    /// Fail any exec whose SQL contains this marker.
    pub fail_marker: Mutex<Option<String>>,
    /// Artificial latency per exec_batch call.
    pub exec_delay: Mutex<Option<Duration>>,
    /// Pools opened so far.
    pub open_count: AtomicUsize,
    /// Pools closed so far.
    pub close_count: AtomicUsize,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_table(&self, owner: &str, table: TableModel, rows: Vec<Row>) {
        let key = (owner.to_string(), table.table_name.clone());
        self.tables.lock().unwrap().insert(key.clone(), table);
        self.rows.lock().unwrap().insert(key, rows);
    }

    pub fn set_fail_marker(&self, marker: &str) {
        *self.fail_marker.lock().unwrap() = Some(marker.to_string());
    }

    pub fn set_exec_delay(&self, delay: Duration) {
        *self.exec_delay.lock().unwrap() = Some(delay);
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }
}

pub struct MockOpener {
    pub state: Arc<MockState>,
}

impl MockOpener {
    pub fn new(state: Arc<MockState>) -> Arc<Self> {
        Arc::new(Self { state })
    }
}

#[async_trait]
impl ConnectionOpener for MockOpener {
    async fn open(
        &self,
        _config: &DatabaseConfig,
        _username: &str,
        _password: &str,
        _owner: &str,
    ) -> Result<Arc<dyn Connection>> {
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

pub struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn exec_batch(&self, statements: &[SqlStatement], _transactional: bool) -> Result<u64> {
        let delay = *self.state.exec_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let marker = self.state.fail_marker.lock().unwrap().clone();
        for statement in statements {
            if let Some(marker) = &marker {
                if statement.sql.contains(marker) {
                    return Err(DbError::execution(
                        statement.sql.clone(),
                        statement.params_display(),
                        "injected failure",
                    ));
                }
            }
            self.state.executed.lock().unwrap().push(statement.clone());
        }
        Ok(statements.len() as u64)
    }

    async fn query_page(&self, statement: &SqlStatement, page: &Page) -> Result<(Vec<Row>, i64)> {
        let rows = self.state.rows.lock().unwrap();
        for ((_, table), data) in rows.iter() {
            if statement.sql.contains(table.as_str()) {
                let total = data.len() as i64;
                let slice: Vec<Row> = data
                    .iter()
                    .skip(page.offset())
                    .take(page.page_size)
                    .cloned()
                    .collect();
                return Ok((slice, total));
            }
        }
        Ok((Vec::new(), 0))
    }

    async fn owners(&self) -> Result<Vec<String>> {
        let tables = self.state.tables.lock().unwrap();
        let mut owners: Vec<String> = tables.keys().map(|(o, _)| o.clone()).collect();
        owners.sort();
        owners.dedup();
        Ok(owners)
    }

    async fn tables(&self, owner: &str) -> Result<Vec<TableModel>> {
        let tables = self.state.tables.lock().unwrap();
        let mut found: Vec<TableModel> = tables
            .iter()
            .filter(|((o, _), _)| o.as_str() == owner)
            .map(|(_, t)| t.clone())
            .collect();
        found.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(found)
    }

    async fn table_detail(&self, owner: &str, table: &str) -> Result<Option<TableModel>> {
        let tables = self.state.tables.lock().unwrap();
        Ok(tables.get(&(owner.to_string(), table.to_string())).cloned())
    }

    async fn close(&self) {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A mysql config pointing nowhere in particular; the mock ignores it.
pub fn mock_config() -> DatabaseConfig {
    DatabaseConfig {
        kind: "mysql".to_string(),
        host: "localhost".to_string(),
        port: 3306,
        database: "app".to_string(),
        username: "root".to_string(),
        password: "root".to_string(),
        owner: "app".to_string(),
    }
}
