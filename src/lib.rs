//! transforge: pluggable transcoding job scheduler.
//!
//! This library schedules transcoding tasks against pluggable backends,
//! bounding how many run concurrently, tracking per-task lifecycle state
//! and notifying an external listener of completion via an HTTP callback
//! with bounded retry.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use transforge::{SchedulerConfig, TransManager};
//!
//! let manager = TransManager::new(
//!     SchedulerConfig::new(2)
//!         .with_try_times(3)
//!         .with_callback_address("http://listener.example.com/done"),
//! );
//!
//! manager.register_plugin(".flv", Arc::new(|| Arc::new(FlvPlugin::new()))).await;
//! manager.run().await?;
//!
//! let task = manager.add_task("clip.flv", "clip.mp4", args).await?;
//! ```

// Core modules
pub mod callback;
pub mod config;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod scheduler;

// Re-export the public surface
pub use callback::{Call, CallbackNotifier};
pub use config::SchedulerConfig;
pub use error::{CallbackError, SchedulerError};
pub use plugin::{
    error_class, ExecArgs, PluginError, PluginFactory, TransMessage, TransPlugin,
    CODE_INVALID_ARGS, CODE_PLUGIN_FAILURE, CODE_SUCCESS, CODE_TIMEOUT,
};
pub use registry::PluginRegistry;
pub use scheduler::{SchedulerStats, TaskStatus, TaskView, TransManager};
