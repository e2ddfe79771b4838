//! Generic lifecycle for long-running asynchronous tasks.
//!
//! Every launched task is registered in a [`TaskRegistry`] before its
//! worker starts, so a caller polling immediately after launch always
//! finds it. Workers check the cooperative cancellation flag at row/batch
//! boundaries, report progress through callbacks, and are wrapped in a
//! panic boundary that converts any fault into the task's terminal error,
//! so a crashing worker never leaves its registry entry stuck in "running".

pub mod execute;
pub mod export;
pub mod generate;
pub mod import;
pub mod sync;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::{DbError, Result};

/// How long a launcher waits for the spawned worker, solely to surface
/// immediate synchronous errors (e.g. a failed initial connection) before
/// returning the task handle. Best effort, not a guarantee.
const LAUNCH_GRACE: Duration = Duration::from_millis(100);

/// Task direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Export,
    Import,
    Sync,
    Execute,
    Generate,
}

/// Caller-visible task state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Unique, caller-visible task identifier.
    pub task_id: String,

    /// Task direction.
    pub kind: TaskKind,

    /// Whether the task reached a terminal state.
    pub is_end: bool,

    /// Whether cancellation was requested.
    pub is_stop: bool,

    /// Rows/statements prepared so far.
    pub ready_count: i64,

    /// Units completed successfully.
    pub success_count: i64,

    /// Units that failed.
    pub error_count: i64,

    /// Planned total, when known up front.
    pub total_count: i64,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_ms: i64,

    /// Terminal error message. A terminal snapshot carries either a normal
    /// completion or this, never neither.
    pub error: Option<String>,

    /// Task-specific extras (export artifact paths, execute results).
    #[serde(default)]
    pub extend: serde_json::Map<String, serde_json::Value>,
}

/// Counter snapshot passed to progress callbacks at batch boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    pub task_id: String,
    pub kind: TaskKind,
    pub ready_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub total_count: i64,
}

/// Progress callback invoked at batch boundaries.
pub type ProgressCallback = Arc<dyn Fn(&TaskProgress) + Send + Sync>;

/// Callback for non-fatal errors reported during progress. These are
/// logged, not thrown: they never abort the batch loop by themselves.
pub type ErrorCallback = Arc<dyn Fn(&DbError) + Send + Sync>;

/// Optional progress/error callbacks carried in task parameters.
#[derive(Clone, Default)]
pub struct TaskCallbacks {
    pub on_progress: Option<ProgressCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl TaskCallbacks {
    /// Report a progress snapshot.
    pub(crate) fn progress(&self, handle: &TaskHandle) {
        let progress = handle.progress();
        info!(
            "task {} progress: ready={} success={} error={} total={}",
            progress.task_id,
            progress.ready_count,
            progress.success_count,
            progress.error_count,
            progress.total_count
        );
        if let Some(callback) = &self.on_progress {
            callback(&progress);
        }
    }

    /// Report a non-fatal error.
    pub(crate) fn error(&self, err: &DbError) {
        warn!("task batch error: {}", err);
        if let Some(callback) = &self.on_error {
            callback(err);
        }
    }
}

struct Terminal {
    ended: bool,
    end_time: Option<DateTime<Utc>>,
    error: Option<String>,
    extend: serde_json::Map<String, serde_json::Value>,
}

struct TaskInner {
    id: String,
    kind: TaskKind,
    start_time: DateTime<Utc>,
    cancel: AtomicBool,
    ready: AtomicI64,
    success: AtomicI64,
    errors: AtomicI64,
    total: AtomicI64,
    terminal: Mutex<Terminal>,
}

/// Shared handle to one task's state.
///
/// The worker owns the counters; the cancellation flag is the only field
/// writable by other threads. Pollers read consistent snapshots.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskInner>,
}

impl TaskHandle {
    fn new(kind: TaskKind) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                start_time: Utc::now(),
                cancel: AtomicBool::new(false),
                ready: AtomicI64::new(0),
                success: AtomicI64::new(0),
                errors: AtomicI64::new(0),
                total: AtomicI64::new(0),
                terminal: Mutex::new(Terminal {
                    ended: false,
                    end_time: None,
                    error: None,
                    extend: serde_json::Map::new(),
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TaskKind {
        self.inner.kind
    }

    /// Whether cancellation has been requested. Workers check this at
    /// every row/batch/table boundary.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.load(Ordering::Relaxed)
    }

    /// Request cooperative cancellation.
    pub fn request_stop(&self) {
        self.inner.cancel.store(true, Ordering::Relaxed);
    }

    pub fn add_ready(&self, n: i64) {
        self.inner.ready.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_success(&self, n: i64) {
        self.inner.success.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_error(&self, n: i64) {
        self.inner.errors.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_total(&self, n: i64) {
        self.inner.total.fetch_add(n, Ordering::Relaxed);
    }

    /// Attach a task-specific extra to the snapshot.
    pub fn set_extend(&self, key: &str, value: serde_json::Value) {
        let mut terminal = self.inner.terminal.lock().expect("terminal lock");
        terminal.extend.insert(key.to_string(), value);
    }

    fn progress(&self) -> TaskProgress {
        TaskProgress {
            task_id: self.inner.id.clone(),
            kind: self.inner.kind,
            ready_count: self.inner.ready.load(Ordering::Relaxed),
            success_count: self.inner.success.load(Ordering::Relaxed),
            error_count: self.inner.errors.load(Ordering::Relaxed),
            total_count: self.inner.total.load(Ordering::Relaxed),
        }
    }

    /// End-of-task bookkeeping: stamps end time, elapsed, the ended flag,
    /// and the terminal error. Runs exactly once per task, on every path
    /// out of the worker, including recovered panics.
    fn finish(&self, outcome: &Result<()>) {
        let mut terminal = self.inner.terminal.lock().expect("terminal lock");
        terminal.ended = true;
        terminal.end_time = Some(Utc::now());
        match outcome {
            Ok(()) => info!("task {} ended", self.inner.id),
            Err(err) => {
                let message = err.to_string();
                error!("task {} ended with error: {}", self.inner.id, message);
                terminal.error = Some(message);
            }
        }
    }

    /// Consistent point-in-time view of the task.
    pub fn snapshot(&self) -> TaskSnapshot {
        let terminal = self.inner.terminal.lock().expect("terminal lock");
        let end_time = terminal.end_time;
        let elapsed_ms = end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.inner.start_time)
            .num_milliseconds();
        TaskSnapshot {
            task_id: self.inner.id.clone(),
            kind: self.inner.kind,
            is_end: terminal.ended,
            is_stop: self.is_cancelled(),
            ready_count: self.inner.ready.load(Ordering::Relaxed),
            success_count: self.inner.success.load(Ordering::Relaxed),
            error_count: self.inner.errors.load(Ordering::Relaxed),
            total_count: self.inner.total.load(Ordering::Relaxed),
            start_time: self.inner.start_time,
            end_time,
            elapsed_ms,
            error: terminal.error.clone(),
            extend: terminal.extend.clone(),
        }
    }
}

/// Process-wide task lookup, constructed once and injected into every
/// component that launches or polls tasks.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, handle: TaskHandle) {
        let mut tasks = self.tasks.lock().expect("registry lock");
        tasks.insert(handle.id().to_string(), handle);
    }

    /// Snapshot a task's state, or None when unknown.
    pub fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        let tasks = self.tasks.lock().expect("registry lock");
        tasks.get(task_id).map(TaskHandle::snapshot)
    }

    /// Set the cancellation flag of a task. Returns false when unknown.
    pub fn stop(&self, task_id: &str) -> bool {
        let tasks = self.tasks.lock().expect("registry lock");
        match tasks.get(task_id) {
            Some(handle) => {
                handle.request_stop();
                true
            }
            None => false,
        }
    }

    /// Remove a task from the registry, returning its final snapshot.
    ///
    /// Tasks are never evicted automatically; callers clean terminated
    /// tasks explicitly. Cleaning a still-running task is a caller error.
    pub fn clean(&self, task_id: &str) -> Option<TaskSnapshot> {
        let mut tasks = self.tasks.lock().expect("registry lock");
        tasks.remove(task_id).map(|handle| handle.snapshot())
    }
}

/// Register a task and spawn its worker.
///
/// The worker future runs inside a panic boundary; any fault becomes the
/// task's terminal error. The launcher waits [`LAUNCH_GRACE`] for early
/// termination so immediate failures surface synchronously; in that case
/// the dead task is cleaned and the error returned instead of a handle.
pub(crate) async fn launch_task<F, Fut>(
    registry: &Arc<TaskRegistry>,
    kind: TaskKind,
    work: F,
) -> Result<TaskSnapshot>
where
    F: FnOnce(TaskHandle) -> Fut,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let handle = TaskHandle::new(kind);
    let task_id = handle.id().to_string();
    registry.register(handle.clone());

    let fut = work(handle.clone());
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let worker = handle.clone();
    tokio::spawn(async move {
        let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(DbError::Task(panic_message(panic))),
        };
        worker.finish(&outcome);
        let _ = done_tx.send(());
    });

    let _ = tokio::time::timeout(LAUNCH_GRACE, done_rx).await;

    let snapshot = registry
        .get(&task_id)
        .ok_or_else(|| DbError::Task(format!("task {} vanished during launch", task_id)))?;
    if snapshot.is_end {
        if let Some(message) = &snapshot.error {
            registry.clean(&task_id);
            return Err(DbError::Task(message.clone()));
        }
    }
    Ok(snapshot)
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "task worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_then_get_never_not_found() {
        let registry = Arc::new(TaskRegistry::new());
        let snapshot = launch_task(&registry, TaskKind::Execute, |handle| async move {
            handle.add_total(1);
            Ok::<(), DbError>(())
        })
        .await
        .unwrap();

        assert!(registry.get(&snapshot.task_id).is_some());
    }

    #[tokio::test]
    async fn test_clean_after_end_removes_task() {
        let registry = Arc::new(TaskRegistry::new());
        let snapshot = launch_task(&registry, TaskKind::Execute, |_| async {
            Ok::<(), DbError>(())
        })
        .await
        .unwrap();

        // Wait for the worker to reach terminal state.
        let mut last = registry.get(&snapshot.task_id).unwrap();
        while !last.is_end {
            tokio::time::sleep(Duration::from_millis(5)).await;
            last = registry.get(&snapshot.task_id).unwrap();
        }
        assert!(last.error.is_none());

        assert!(registry.clean(&snapshot.task_id).is_some());
        assert!(registry.get(&snapshot.task_id).is_none());
    }

    #[tokio::test]
    async fn test_panic_becomes_terminal_error() {
        let registry = Arc::new(TaskRegistry::new());
        let result = launch_task(&registry, TaskKind::Execute, |_| async {
            let boom = true;
            if boom {
                panic!("worker exploded");
            }
            Ok::<(), DbError>(())
        })
        .await;

        // The panic surfaced within the launch grace period.
        match result {
            Err(DbError::Task(message)) => assert!(message.contains("worker exploded")),
            other => panic!("expected task error, got {:?}", other.map(|s| s.task_id)),
        }
    }

    #[tokio::test]
    async fn test_early_error_cleans_registry() {
        let registry = Arc::new(TaskRegistry::new());
        let result = launch_task(&registry, TaskKind::Import, |_| async {
            Err::<(), DbError>(DbError::Config("bad target".to_string()))
        })
        .await;

        assert!(result.is_err());
        let tasks = registry.tasks.lock().unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_stop_sets_flag_and_worker_ends_clean() {
        let registry = Arc::new(TaskRegistry::new());
        let snapshot = launch_task(&registry, TaskKind::Generate, |handle| async move {
            for _ in 0..1000 {
                if handle.is_cancelled() {
                    break;
                }
                handle.add_ready(1);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok::<(), DbError>(())
        })
        .await
        .unwrap();

        assert!(registry.stop(&snapshot.task_id));
        let mut last = registry.get(&snapshot.task_id).unwrap();
        while !last.is_end {
            tokio::time::sleep(Duration::from_millis(5)).await;
            last = registry.get(&snapshot.task_id).unwrap();
        }
        assert!(last.is_stop);
        assert!(last.error.is_none());
        assert!(last.ready_count < 1000);
    }
}
