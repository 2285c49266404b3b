//! Transcode plugin contract.
//!
//! A plugin is a pluggable executor for one input format. The scheduler
//! depends only on the capability set defined here:
//!
//! - `execute`: run the transcode and report a result or a coded failure
//! - `cancel`: abort the in-flight transcode
//! - `progress`: report backend-defined progress fields
//!
//! Plugins are stateful per job: each task gets a fresh instance from its
//! registered factory and owns it for the task's whole lifetime. Instances
//! are never shared across tasks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Execution arguments passed to a plugin, keyed by option name.
///
/// For an ffmpeg-style backend this is typically a set of encoder knobs,
/// e.g. `{"-b:v": 1200000, "-r": 30}`.
pub type ExecArgs = HashMap<String, serde_json::Value>;

/// Status code reported by a successful execution.
pub const CODE_SUCCESS: i32 = 0;
/// The plugin rejected its execution arguments.
pub const CODE_INVALID_ARGS: i32 = 1;
/// The backend process or library failed.
pub const CODE_PLUGIN_FAILURE: i32 = 2;
/// The backend gave up after its own internal deadline.
pub const CODE_TIMEOUT: i32 = 3;

/// Maps a status code to its human-readable classification.
///
/// The code taxonomy is plugin-defined beyond the fixed entries here;
/// unknown codes classify as `"Unknown"` and are otherwise carried through
/// to the callback payload unchanged.
pub fn error_class(code: i32) -> &'static str {
    match code {
        CODE_SUCCESS => "Success",
        CODE_INVALID_ARGS => "InvalidArgs",
        CODE_PLUGIN_FAILURE => "PluginFailure",
        CODE_TIMEOUT => "Timeout",
        _ => "Unknown",
    }
}

/// Output of a completed transcode.
///
/// Carries whatever the backend printed or measured while transcoding;
/// embedded verbatim in the callback payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransMessage {
    /// Primary human-readable result line.
    pub message: String,
    /// Optional backend-specific detail (codec stats, timings, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl TransMessage {
    /// Creates a message with no detail payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches a backend-specific detail payload.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// A coded failure reported by a plugin.
///
/// The code travels through the scheduler unchanged and ends up in the
/// callback payload next to its [`error_class`] classification.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("plugin error (code {code}): {message}")]
pub struct PluginError {
    /// Status code from the plugin's taxonomy (never 0).
    pub code: i32,
    /// Raw error detail from the backend.
    pub message: String,
}

impl PluginError {
    /// Creates a plugin error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Capability contract implemented by every transcode backend.
#[async_trait]
pub trait TransPlugin: Send + Sync {
    /// Returns the plugin kind, e.g. `"ffmpeg-flv"`.
    fn kind(&self) -> &str;

    /// Runs the transcode from `input` to `output`.
    ///
    /// Expected to be long-running; the scheduler never holds any lock
    /// across this call. A successful run returns the backend's output
    /// message; a failure returns a coded [`PluginError`].
    async fn execute(
        &self,
        input: &str,
        output: &str,
        args: &ExecArgs,
    ) -> Result<TransMessage, PluginError>;

    /// Aborts the in-flight transcode.
    async fn cancel(&self) -> Result<(), PluginError>;

    /// Reports backend-defined progress fields for the current transcode.
    async fn progress(&self) -> Result<HashMap<String, serde_json::Value>, PluginError>;
}

/// Factory producing a fresh plugin instance per task.
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn TransPlugin> + Send + Sync>;
