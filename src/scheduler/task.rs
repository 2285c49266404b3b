//! Task definitions for the scheduler.
//!
//! A task is one transcode request tracked through its lifecycle:
//!
//! ```text
//! Not Start ──> Running ──> { Success | Error | Cancel }
//! ```
//!
//! Transitions are forward-only and a task leaves the queue the moment it
//! reaches a terminal state. Task ids are never reused.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plugin::{ExecArgs, TransPlugin};

/// Lifecycle status of a task.
///
/// Serialized with the wire names the callback listener expects
/// (`"Not Start"`, `"Running"`, `"Success"`, `"Error"`, `"Cancel"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Queued, waiting for dispatch.
    #[serde(rename = "Not Start")]
    NotStarted,
    /// Dispatched and currently transcoding.
    Running,
    /// Transcode finished successfully.
    Success,
    /// Transcode failed.
    Error,
    /// Cancelled before completion.
    Cancel,
}

impl TaskStatus {
    /// Returns whether this status ends the task's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancel)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::NotStarted => write!(f, "Not Start"),
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Success => write!(f, "Success"),
            TaskStatus::Error => write!(f, "Error"),
            TaskStatus::Cancel => write!(f, "Cancel"),
        }
    }
}

/// A queued transcode task and the plugin instance bound to it.
///
/// The plugin is instantiated from its registered factory at creation time
/// and belongs to this task alone. The `Arc` exists only so the cancel
/// path and the executor can reach the same instance; it is never handed
/// to another task.
#[derive(Clone)]
pub(crate) struct Task {
    pub id: Uuid,
    pub input: String,
    pub output: String,
    pub args: ExecArgs,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub plugin: Arc<dyn TransPlugin>,
}

impl Task {
    /// Creates a task in `Not Start` status with a fresh id.
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        args: ExecArgs,
        plugin: Arc<dyn TransPlugin>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.into(),
            output: output.into(),
            args,
            status: TaskStatus::NotStarted,
            created_at: Utc::now(),
            plugin,
        }
    }

    /// Returns the serializable snapshot exposed to callers and listeners.
    pub fn view(&self) -> TaskView {
        TaskView {
            id: self.id,
            input: self.input.clone(),
            output: self.output.clone(),
            args: self.args.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("status", &self.status)
            .field("plugin", &self.plugin.kind())
            .finish()
    }
}

/// Snapshot of a task as exposed to callers and the callback listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    /// Unique task identifier.
    pub id: Uuid,
    /// Input file path.
    pub input: String,
    /// Output file path.
    pub output: String,
    /// Execution arguments the plugin was invoked with.
    pub args: ExecArgs,
    /// Lifecycle status at snapshot time.
    pub status: TaskStatus,
    /// When the task was added to the queue.
    pub created_at: DateTime<Utc>,
}
