//! In-memory FIFO task queue.
//!
//! The queue holds every pending and running task in insertion order and
//! is the scheduler's only shared mutable state. One exclusive lock guards
//! the task list *and* the running counter so that dispatch marking,
//! completion and cancellation are atomic with respect to each other; the
//! lock is held only for the duration of a mutation and never across a
//! plugin invocation or a network call.
//!
//! Removal preserves the relative order of the surviving tasks, so
//! dispatch stays FIFO among whatever is still pending.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::task::{Task, TaskStatus, TaskView};
use crate::plugin::TransPlugin;

/// Lock-guarded queue state: ordered tasks plus the running counter.
struct QueueInner {
    tasks: Vec<Task>,
    running: usize,
}

/// Ordered collection of pending and running tasks.
pub(crate) struct TaskQueue {
    inner: Mutex<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tasks: Vec::new(),
                running: 0,
            }),
        }
    }

    /// Appends a task at the tail. The tail is the only insertion point.
    pub async fn push(&self, task: Task) {
        self.inner.lock().await.tasks.push(task);
    }

    /// Returns a page of task snapshots in queue order plus the total count.
    ///
    /// `limit < 0` returns everything from `skip`; an out-of-range `skip`
    /// yields an empty page, not an error.
    pub async fn list(&self, limit: i64, skip: usize) -> (Vec<TaskView>, usize) {
        let inner = self.inner.lock().await;
        let total = inner.tasks.len();

        let page = inner
            .tasks
            .iter()
            .skip(skip)
            .take(if limit < 0 { usize::MAX } else { limit as usize })
            .map(Task::view)
            .collect();

        (page, total)
    }

    /// Selects up to `max_running - running` pending tasks for execution.
    ///
    /// Each selected task is marked `Running` and counted against the
    /// budget in the same critical section, so overlapping dispatch cycles
    /// can never select the same task twice. Returns clones for the
    /// executors; the queue keeps the originals until completion.
    pub async fn take_dispatchable(&self, max_running: usize) -> Vec<Task> {
        let mut inner = self.inner.lock().await;
        let available = max_running.saturating_sub(inner.running);
        if available == 0 {
            return Vec::new();
        }

        let mut selected = Vec::new();
        for task in inner.tasks.iter_mut() {
            if selected.len() == available {
                break;
            }
            if task.status == TaskStatus::NotStarted {
                task.status = TaskStatus::Running;
                selected.push(task.clone());
            }
        }

        inner.running += selected.len();
        selected
    }

    /// Finishes a dispatched task: records its terminal status, frees one
    /// unit of budget and removes it from the queue.
    ///
    /// Returns the final snapshot, or `None` when the task is no longer
    /// queued as running, meaning a concurrent cancel won the race.
    pub async fn complete(&self, id: Uuid, status: TaskStatus) -> Option<TaskView> {
        let mut inner = self.inner.lock().await;
        let index = inner
            .tasks
            .iter()
            .position(|t| t.id == id && t.status == TaskStatus::Running)?;

        let mut task = inner.tasks.remove(index);
        task.status = status;
        inner.running = inner.running.saturating_sub(1);
        Some(task.view())
    }

    /// Returns the plugin bound to a queued task.
    pub async fn plugin_of(&self, id: Uuid) -> Option<Arc<dyn TransPlugin>> {
        let inner = self.inner.lock().await;
        inner
            .tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| Arc::clone(&t.plugin))
    }

    /// Marks a task cancelled and removes it.
    ///
    /// Frees a unit of budget if the task was already dispatched. Returns
    /// `false` when the task is gone, meaning it completed concurrently.
    pub async fn remove_cancelled(&self, id: Uuid) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(index) = inner.tasks.iter().position(|t| t.id == id) else {
            return false;
        };

        let task = inner.tasks.remove(index);
        if task.status == TaskStatus::Running {
            inner.running = inner.running.saturating_sub(1);
        }
        true
    }

    /// Number of tasks currently in the queue (pending plus running).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.tasks.len()
    }

    /// Number of tasks currently executing.
    pub async fn running(&self) -> usize {
        self.inner.lock().await.running
    }
}
