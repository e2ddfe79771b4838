//! # dbtask
//!
//! Cross-dialect database task engine. The crate turns a desired-vs-current
//! table definition into an ordered, dialect-correct DDL sequence, browses
//! paged data through a normalizing projector, and runs long-lived
//! asynchronous Export/Import/Sync/Execute tasks (plus scripted bulk-data
//! generation) over pooled, per-credential connections with progress
//! tracking and cooperative cancellation.
//!
//! SQL dialects are pure text-generation strategies; the low-level driver
//! is consumed through the [`core::Connection`] trait and injected, so the
//! engine itself never speaks a wire protocol.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dbtask::{DatabaseConfig, Service, TaskRegistry};
//! # use dbtask::core::ConnectionOpener;
//! # fn opener() -> Arc<dyn ConnectionOpener> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> dbtask::Result<()> {
//!     let config = DatabaseConfig::load("config.yaml")?;
//!     let registry = Arc::new(TaskRegistry::new());
//!     let service = Service::connect(config, opener(), registry).await?;
//!     let ddl = service.ddl(&Default::default(), "app", Some("orders")).await?;
//!     println!("{}", ddl.join(";\n"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod pool;
pub mod project;
pub mod script;
pub mod service;
pub mod task;

// Re-exports for convenient access
pub use config::{DatabaseConfig, SqlRender, StatementOptions};
pub use crate::core::{
    CellValue, ColumnModel, IndexModel, Page, Row, SqlStatement, TableModel, UpdateTableColumn,
    UpdateTableIndex, UpdateTableParam,
};
pub use dialect::DialectImpl;
pub use error::{DbError, Result};
pub use pool::PoolManager;
pub use project::DataPage;
pub use service::Service;
pub use task::execute::{ExecuteParam, StatementResult};
pub use task::export::{ExportOwner, ExportParam};
pub use task::generate::{ColumnSeed, GenerateParam, StrategyRow};
pub use task::import::{ImportOwner, ImportParam, ImportTable};
pub use task::sync::{SyncOwner, SyncParam, SyncTable};
pub use task::{TaskCallbacks, TaskKind, TaskProgress, TaskRegistry, TaskSnapshot};
