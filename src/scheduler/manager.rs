//! Transcoding task scheduler.
//!
//! [`TransManager`] owns the concurrency budget and coordinates the task
//! lifecycle:
//!
//! - `add_task` validates the request, binds a fresh plugin instance and
//!   appends the task to the queue
//! - one long-lived dispatch loop consumes work-available signals and
//!   starts as many pending tasks as the remaining budget allows
//! - each dispatched task executes in its own spawned task, so a
//!   panicking plugin can never take down the loop or other transcodes
//! - on completion the executor reports through the callback notifier,
//!   frees its budget unit and re-signals the loop
//!
//! Signals are coalescible: the loop always re-scans the queue, so a
//! dropped signal at worst delays dispatch until the fallback tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::TaskQueue;
use super::task::{Task, TaskStatus, TaskView};
use crate::callback::{Call, CallbackNotifier};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::plugin::{
    error_class, ExecArgs, PluginError, PluginFactory, TransMessage, CODE_PLUGIN_FAILURE,
    CODE_SUCCESS,
};
use crate::registry::{format_suffix, PluginRegistry};

/// Counters kept across the scheduler's lifetime.
struct SharedStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl SharedStats {
    fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }
}

/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Tasks currently in the queue (pending plus running).
    pub queued: usize,
    /// Tasks currently executing.
    pub running: usize,
    /// Tasks that reached `Success`.
    pub succeeded: u64,
    /// Tasks that reached `Error`.
    pub failed: u64,
    /// Tasks cancelled before completion.
    pub cancelled: u64,
}

struct ManagerInner {
    config: SchedulerConfig,
    registry: RwLock<PluginRegistry>,
    queue: TaskQueue,
    notifier: CallbackNotifier,
    sign_tx: mpsc::Sender<()>,
    /// Taken by the first `run()` call; `None` afterwards.
    sign_rx: Mutex<Option<mpsc::Receiver<()>>>,
    stats: SharedStats,
}

/// Transcoding task scheduler with a bounded concurrency budget.
///
/// Cheap to clone; clones share the same queue and budget. Construct one
/// per configuration instead of relying on any process-wide instance.
#[derive(Clone)]
pub struct TransManager {
    inner: Arc<ManagerInner>,
}

impl TransManager {
    /// Creates a scheduler from its configuration. No tasks run until
    /// [`run`](Self::run) starts the dispatch loop.
    pub fn new(config: SchedulerConfig) -> Self {
        let (sign_tx, sign_rx) = mpsc::channel(config.sign_capacity.max(1));
        let notifier = CallbackNotifier::new(&config);

        Self {
            inner: Arc::new(ManagerInner {
                config,
                registry: RwLock::new(PluginRegistry::new()),
                queue: TaskQueue::new(),
                notifier,
                sign_tx,
                sign_rx: Mutex::new(Some(sign_rx)),
                stats: SharedStats::new(),
            }),
        }
    }

    /// Registers a plugin factory for a format, like `.flv` or `.avi`.
    ///
    /// Registering an already-known format overwrites its factory.
    pub async fn register_plugin(&self, format: &str, factory: PluginFactory) {
        self.inner.registry.write().await.register(format, factory);
    }

    /// Returns the supported formats in registration order.
    pub async fn supported_formats(&self) -> Vec<String> {
        self.inner.registry.read().await.formats()
    }

    /// Starts the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` on a second call.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        let rx = self
            .inner
            .sign_rx
            .lock()
            .await
            .take()
            .ok_or(SchedulerError::AlreadyRunning)?;

        // The loop gets only a weak handle; dropping the last manager
        // clone tears the scheduler down instead of leaking the task.
        tokio::spawn(dispatch_loop(Arc::downgrade(&self.inner), rx));

        info!(
            max_running_num = self.inner.config.max_running_num,
            "scheduler started"
        );
        Ok(())
    }

    /// Queues a transcode task. The task does not start here; it starts
    /// when the dispatch loop has budget for it.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when either path has no format suffix
    /// - `UnsupportedFormat` when no plugin is registered for the input's
    ///   format
    ///
    /// Neither failure mutates the queue.
    pub async fn add_task(
        &self,
        input: &str,
        output: &str,
        args: ExecArgs,
    ) -> Result<TaskView, SchedulerError> {
        let input_format = format_suffix(input)
            .ok_or_else(|| SchedulerError::InvalidInput(input.to_string()))?;
        format_suffix(output).ok_or_else(|| SchedulerError::InvalidInput(output.to_string()))?;

        let factory = self
            .inner
            .registry
            .read()
            .await
            .resolve(&input_format)
            .ok_or(SchedulerError::UnsupportedFormat(input_format.clone()))?;

        let task = Task::new(input, output, args, factory());
        let view = task.view();

        self.inner.queue.push(task).await;
        let _ = self.inner.sign_tx.try_send(());

        info!(
            task_id = %view.id,
            input,
            output,
            format = %input_format,
            "task queued"
        );
        Ok(view)
    }

    /// Returns a page of task snapshots in queue order plus the total
    /// task count. `limit < 0` returns everything from `skip`.
    pub async fn list_tasks(&self, limit: i64, skip: usize) -> (Vec<TaskView>, usize) {
        self.inner.queue.list(limit, skip).await
    }

    /// Cancels a queued or running task.
    ///
    /// The plugin's cancel runs outside the queue lock and its error is
    /// surfaced unchanged, leaving the task queued so the caller may retry.
    /// A task that reached a terminal state concurrently, whether before
    /// lookup or while the plugin's cancel was in flight, reports
    /// `TaskNotFound`; callers should read that as "already finished or
    /// never existed". No callback is sent for cancelled tasks.
    pub async fn cancel(&self, id: Uuid) -> Result<(), SchedulerError> {
        let plugin = self
            .inner
            .queue
            .plugin_of(id)
            .await
            .ok_or(SchedulerError::TaskNotFound(id))?;

        plugin.cancel().await?;

        if !self.inner.queue.remove_cancelled(id).await {
            // The executor finished it between lookup and removal; it owns
            // the terminal state.
            debug!(task_id = %id, "task already completed before cancel took effect");
            return Err(SchedulerError::TaskNotFound(id));
        }

        self.inner.stats.cancelled.fetch_add(1, Ordering::SeqCst);
        info!(task_id = %id, "task cancelled");

        // A running slot was freed.
        let _ = self.inner.sign_tx.try_send(());
        Ok(())
    }

    /// Reports the backend's progress fields for a queued or running task.
    ///
    /// The field map is plugin-defined and passed through unchanged.
    pub async fn progress(
        &self,
        id: Uuid,
    ) -> Result<HashMap<String, serde_json::Value>, SchedulerError> {
        let plugin = self
            .inner
            .queue
            .plugin_of(id)
            .await
            .ok_or(SchedulerError::TaskNotFound(id))?;

        Ok(plugin.progress().await?)
    }

    /// Returns current scheduler statistics.
    pub async fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.inner.queue.len().await,
            running: self.inner.queue.running().await,
            succeeded: self.inner.stats.succeeded.load(Ordering::SeqCst),
            failed: self.inner.stats.failed.load(Ordering::SeqCst),
            cancelled: self.inner.stats.cancelled.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for TransManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransManager")
            .field("config", &self.inner.config)
            .finish()
    }
}

/// The coordinating loop: one logical thread of control that reacts to
/// work-available signals and dispatches within the budget.
async fn dispatch_loop(inner: Weak<ManagerInner>, mut sign_rx: mpsc::Receiver<()>) {
    let Some(poll_interval) = inner.upgrade().map(|i| i.config.poll_interval) else {
        return;
    };

    loop {
        tokio::select! {
            signal = sign_rx.recv() => {
                if signal.is_none() {
                    // All senders gone; every manager handle and executor
                    // has been dropped.
                    break;
                }
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };

        let batch = inner
            .queue
            .take_dispatchable(inner.config.max_running_num)
            .await;

        for task in batch {
            debug!(task_id = %task.id, plugin = task.plugin.kind(), "dispatching task");
            tokio::spawn(execute(Arc::clone(&inner), task));
        }
    }

    debug!("dispatch loop stopped");
}

/// Executes one dispatched task end to end.
async fn execute(inner: Arc<ManagerInner>, task: Task) {
    let plugin = Arc::clone(&task.plugin);
    let (input, output, args) = (task.input.clone(), task.output.clone(), task.args.clone());

    // The plugin runs in its own spawned task so a panic surfaces as a
    // JoinError here instead of leaking the budget unit.
    let outcome = match tokio::spawn(async move { plugin.execute(&input, &output, &args).await })
        .await
    {
        Ok(outcome) => outcome,
        Err(join_err) => Err(PluginError::new(
            CODE_PLUGIN_FAILURE,
            format!("plugin execution panicked: {join_err}"),
        )),
    };

    let (status, code, error_message, message) = match outcome {
        Ok(message) => {
            info!(task_id = %task.id, result = %message.message, "task completed");
            (TaskStatus::Success, CODE_SUCCESS, None, message)
        }
        Err(e) => {
            error!(task_id = %task.id, code = e.code, error = %e.message, "task failed");
            (TaskStatus::Error, e.code, Some(e.message), TransMessage::default())
        }
    };

    let finished = inner.queue.complete(task.id, status).await;

    // Free the budget unit before callback delivery, which may sleep
    // through several backoffs; pending work should not wait on it.
    let _ = inner.sign_tx.try_send(());

    let Some(view) = finished else {
        // A concurrent cancel already removed the task; it owns the
        // terminal state and cancellations are callback-silent.
        debug!(task_id = %task.id, "task removed before completion; skipping callback");
        return;
    };

    match status {
        TaskStatus::Success => inner.stats.succeeded.fetch_add(1, Ordering::SeqCst),
        _ => inner.stats.failed.fetch_add(1, Ordering::SeqCst),
    };

    let call = Call {
        code,
        error_class: error_class(code).to_string(),
        error_message,
        task: view,
        message,
    };

    if let Err(e) = inner.notifier.deliver(&call).await {
        warn!(task_id = %task.id, error = %e, "callback delivery failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::TransPlugin;
    use async_trait::async_trait;

    struct NullPlugin;

    #[async_trait]
    impl TransPlugin for NullPlugin {
        fn kind(&self) -> &str {
            "null"
        }

        async fn execute(
            &self,
            _input: &str,
            _output: &str,
            _args: &ExecArgs,
        ) -> Result<TransMessage, PluginError> {
            Ok(TransMessage::new("ok"))
        }

        async fn cancel(&self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn progress(
            &self,
        ) -> Result<HashMap<String, serde_json::Value>, PluginError> {
            Ok(HashMap::from([(
                "frames".to_string(),
                serde_json::json!(120),
            )]))
        }
    }

    fn manager() -> TransManager {
        TransManager::new(SchedulerConfig::default())
    }

    async fn register_flv(manager: &TransManager) {
        manager
            .register_plugin(".flv", Arc::new(|| Arc::new(NullPlugin)))
            .await;
    }

    #[tokio::test]
    async fn test_add_task_requires_input_suffix() {
        let manager = manager();
        register_flv(&manager).await;

        let err = manager
            .add_task("clip", "clip.mp4", ExecArgs::new())
            .await
            .expect_err("should reject suffix-less input");

        assert!(matches!(err, SchedulerError::InvalidInput(_)));
        assert_eq!(manager.list_tasks(-1, 0).await.1, 0);
    }

    #[tokio::test]
    async fn test_add_task_requires_output_suffix() {
        let manager = manager();
        register_flv(&manager).await;

        let err = manager
            .add_task("clip.flv", "clip", ExecArgs::new())
            .await
            .expect_err("should reject suffix-less output");

        assert!(matches!(err, SchedulerError::InvalidInput(_)));
        assert_eq!(manager.list_tasks(-1, 0).await.1, 0);
    }

    #[tokio::test]
    async fn test_add_task_rejects_unregistered_format() {
        let manager = manager();
        register_flv(&manager).await;

        let err = manager
            .add_task("clip.xyz", "clip.flv", ExecArgs::new())
            .await
            .expect_err("should reject unknown format");

        match err {
            SchedulerError::UnsupportedFormat(format) => assert_eq!(format, ".xyz"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manager.list_tasks(-1, 0).await.1, 0);
    }

    #[tokio::test]
    async fn test_add_task_queues_in_not_started() {
        let manager = manager();
        register_flv(&manager).await;

        let view = manager
            .add_task("clip.flv", "clip.mp4", ExecArgs::new())
            .await
            .expect("task should queue");

        assert_eq!(view.status, TaskStatus::NotStarted);

        let (page, total) = manager.list_tasks(-1, 0).await;
        assert_eq!(total, 1);
        assert_eq!(page[0].id, view.id);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_not_found() {
        let manager = manager();
        register_flv(&manager).await;

        let err = manager
            .cancel(Uuid::new_v4())
            .await
            .expect_err("unknown id should fail");

        assert!(matches!(err, SchedulerError::TaskNotFound(_)));
        assert_eq!(manager.stats().await.cancelled, 0);
    }

    #[tokio::test]
    async fn test_cancel_pending_task_removes_it() {
        let manager = manager();
        register_flv(&manager).await;

        let view = manager
            .add_task("clip.flv", "clip.mp4", ExecArgs::new())
            .await
            .expect("queue");

        manager.cancel(view.id).await.expect("cancel should succeed");

        assert_eq!(manager.list_tasks(-1, 0).await.1, 0);
        assert_eq!(manager.stats().await.cancelled, 1);
    }

    #[tokio::test]
    async fn test_progress_unknown_id_is_not_found() {
        let manager = manager();

        let err = manager
            .progress(Uuid::new_v4())
            .await
            .expect_err("unknown id should fail");

        assert!(matches!(err, SchedulerError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_progress_passes_backend_fields_through() {
        let manager = manager();
        register_flv(&manager).await;

        let view = manager
            .add_task("clip.flv", "clip.mp4", ExecArgs::new())
            .await
            .expect("queue");

        let fields = manager.progress(view.id).await.expect("progress");
        assert_eq!(fields.get("frames"), Some(&serde_json::json!(120)));
    }

    #[tokio::test]
    async fn test_run_twice_reports_already_running() {
        let manager = manager();

        manager.run().await.expect("first run");
        let err = manager.run().await.expect_err("second run should fail");

        assert!(matches!(err, SchedulerError::AlreadyRunning));
    }

    #[tokio::test]
    async fn test_supported_formats_round_trip() {
        let manager = manager();
        register_flv(&manager).await;
        manager
            .register_plugin("avi", Arc::new(|| Arc::new(NullPlugin)))
            .await;

        assert_eq!(manager.supported_formats().await, vec![".flv", ".avi"]);
    }
}
