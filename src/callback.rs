//! Completion callback delivery.
//!
//! When a task reaches a terminal state the scheduler POSTs a [`Call`]
//! payload to the configured listener address. Delivery is attempted a
//! bounded number of times; a 200-class response ends the loop, anything
//! else (transport error included) counts as a failed attempt followed by
//! a randomized backoff so retries from many schedulers don't land on the
//! listener at once.
//!
//! At-most-`try_times` attempts is the contract, not guaranteed delivery.

use std::ops::Range;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::CallbackError;
use crate::plugin::TransMessage;
use crate::scheduler::TaskView;

/// Payload POSTed to the completion listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Status code reported by the plugin (0 = success).
    pub code: i32,
    /// Human-readable classification of `code`.
    pub error_class: String,
    /// Raw plugin error, when the task failed.
    pub error_message: Option<String>,
    /// Snapshot of the task at completion.
    pub task: TaskView,
    /// The plugin's result output.
    pub message: TransMessage,
}

/// Delivers completion callbacks with bounded retry.
pub struct CallbackNotifier {
    client: Client,
    address: Option<String>,
    try_times: u32,
    backoff_ms: Range<u64>,
}

impl CallbackNotifier {
    /// Creates a notifier from the scheduler configuration.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            address: config
                .callback_address
                .clone()
                .filter(|addr| !addr.is_empty()),
            try_times: config.try_times,
            backoff_ms: config.callback_backoff_ms.clone(),
        }
    }

    /// Delivers one payload to the configured listener.
    ///
    /// With no address configured this is a no-op, not an error. Otherwise
    /// the payload is POSTed as JSON up to `try_times` times; exhausting
    /// every attempt fails with [`CallbackError::TooManyRetries`]. A zero
    /// `try_times` makes no attempt at all and fails immediately.
    pub async fn deliver(&self, call: &Call) -> Result<(), CallbackError> {
        let Some(address) = self.address.as_deref() else {
            debug!(task_id = %call.task.id, "callback skipped: no address configured");
            return Ok(());
        };

        for attempt in 1..=self.try_times {
            match self.client.post(address).json(call).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        task_id = %call.task.id,
                        attempt,
                        "callback delivered"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    warn!(
                        task_id = %call.task.id,
                        attempt,
                        status = response.status().as_u16(),
                        "callback rejected by listener"
                    );
                }
                Err(e) => {
                    warn!(
                        task_id = %call.task.id,
                        attempt,
                        error = %e,
                        "callback request failed"
                    );
                }
            }

            if attempt < self.try_times {
                tokio::time::sleep(self.backoff()).await;
            }
        }

        Err(CallbackError::TooManyRetries {
            address: address.to_string(),
            attempts: self.try_times,
        })
    }

    /// Uniform random backoff over the configured range.
    fn backoff(&self) -> Duration {
        use rand::RngExt;

        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(self.backoff_ms.clone()))
    }
}

impl std::fmt::Debug for CallbackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackNotifier")
            .field("address", &self.address)
            .field("try_times", &self.try_times)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}
