//! Error types for transforge operations.
//!
//! Defines error types for the two failure surfaces of the scheduler:
//! - Task submission, lookup and cancellation
//! - Callback delivery to the completion listener
//!
//! Backend (plugin) failures are carried opaquely as
//! [`PluginError`](crate::plugin::PluginError) and passed through unchanged.

use thiserror::Error;
use uuid::Uuid;

use crate::plugin::PluginError;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A path was missing a recognizable format suffix.
    #[error("invalid path '{0}': missing format suffix")]
    InvalidInput(String),

    /// No plugin is registered for the input's format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The task id is unknown or the task has already been removed.
    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    /// The dispatch loop has already been started.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// A backend error, surfaced unchanged.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Errors that can occur during callback delivery.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Every delivery attempt failed (transport error or non-200 response).
    #[error("callback to {address} failed after {attempts} attempts")]
    TooManyRetries { address: String, attempts: u32 },
}
