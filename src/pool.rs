//! Connection pool manager.
//!
//! Owns one pooled connection per (credential, owner) tuple against a
//! single database config. Many engines scope authorization and the default
//! schema to the connection itself, so browsing or writing a different
//! owner needs a fresh authenticated pool rather than a session `USE`.
//!
//! A manager belongs to the task that created it: the task acquires pools
//! as it needs them and closes all of them in one cleanup step at the end,
//! on every exit path. A failed acquisition is fatal to the requesting
//! operation but never leaks the sibling pools already opened.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::core::traits::{Connection, ConnectionOpener};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    username: String,
    owner: String,
}

/// Per-task pool cache keyed by (credentials, owner).
pub struct PoolManager {
    config: DatabaseConfig,
    opener: Arc<dyn ConnectionOpener>,
    pools: Mutex<HashMap<PoolKey, Arc<dyn Connection>>>,
}

impl PoolManager {
    /// Create a manager bound to one database config.
    pub fn new(config: DatabaseConfig, opener: Arc<dyn ConnectionOpener>) -> Self {
        Self {
            config,
            opener,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// The config this manager opens pools against.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Acquire the pool for (credentials, owner), opening it lazily.
    ///
    /// Empty credential overrides fall back to the config's own.
    pub async fn acquire(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        owner: &str,
    ) -> Result<Arc<dyn Connection>> {
        let username = match username {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => self.config.username.clone(),
        };
        let password = match password {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.config.password.clone(),
        };

        let key = PoolKey {
            username: username.clone(),
            owner: owner.to_string(),
        };

        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(&key) {
            return Ok(pool.clone());
        }

        debug!(
            "opening pool for {}@{} owner={}",
            username, self.config.host, owner
        );
        let pool = self
            .opener
            .open(&self.config, &username, &password, owner)
            .await?;
        pools.insert(key, pool.clone());
        Ok(pool)
    }

    /// Close every pool this manager opened. Called once at task cleanup,
    /// regardless of which operation failed.
    pub async fn close_all(&self) {
        let pools: Vec<Arc<dyn Connection>> = {
            let mut guard = self.pools.lock().await;
            guard.drain().map(|(_, pool)| pool).collect()
        };
        for pool in pools {
            pool.close().await;
        }
    }
}
