//! Concurrency-gated transcoding scheduler.
//!
//! This module is the coordination core of the crate:
//!
//! - **Task**: one transcode request tracked through its lifecycle
//! - **TaskQueue**: lock-guarded FIFO of pending and running tasks
//! - **TransManager**: the dispatch loop, per-task executors and the
//!   cancel/progress surfaces
//!
//! # Architecture
//!
//! ```text
//!   add_task ──┐                      ┌─> executor ─> callback
//!              ▼                      │
//!        ┌──────────┐   signal   ┌────┴─────┐
//!        │TaskQueue │ ─────────> │ dispatch │  (budget: max_running_num)
//!        │ (FIFO)   │ <───────── │   loop   │
//!        └──────────┘  re-scan   └────┬─────┘
//!              ▲                      │
//!   cancel ────┘                      └─> executor ─> callback
//! ```
//!
//! Every queue mutation happens under one exclusive lock; plugin
//! execution and callback delivery always run outside it.

pub mod manager;
pub(crate) mod queue;
pub mod task;

pub use manager::{SchedulerStats, TransManager};
pub use task::{TaskStatus, TaskView};
