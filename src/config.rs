//! Scheduler configuration.

use std::ops::Range;
use std::time::Duration;

/// Configuration for a [`TransManager`](crate::scheduler::TransManager).
///
/// Every scheduler instance is constructed with its own configuration;
/// there is no process-wide default instance.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of tasks transcoding concurrently.
    pub max_running_num: usize,
    /// Delivery attempts per completion callback.
    pub try_times: u32,
    /// Listener address for completion callbacks. `None` disables delivery.
    pub callback_address: Option<String>,
    /// Capacity of the work-available signal channel. Signals are
    /// coalescible, so a full channel only delays a re-scan.
    pub sign_capacity: usize,
    /// Fallback tick for the dispatch loop, guarding against missed
    /// wake-ups.
    pub poll_interval: Duration,
    /// Uniform range, in milliseconds, for the randomized sleep between
    /// callback delivery attempts.
    pub callback_backoff_ms: Range<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_running_num: 1,
            try_times: 1,
            callback_address: None,
            sign_capacity: 256,
            poll_interval: Duration::from_secs(1),
            callback_backoff_ms: 10_000..20_000,
        }
    }
}

impl SchedulerConfig {
    /// Creates a configuration with the given concurrency budget.
    pub fn new(max_running_num: usize) -> Self {
        Self {
            max_running_num,
            ..Default::default()
        }
    }

    /// Sets the maximum number of concurrently running tasks.
    pub fn with_max_running_num(mut self, num: usize) -> Self {
        self.max_running_num = num;
        self
    }

    /// Sets the number of delivery attempts per callback.
    pub fn with_try_times(mut self, try_times: u32) -> Self {
        self.try_times = try_times;
        self
    }

    /// Sets the callback listener address, like `http://callback.example.com/done`.
    ///
    /// An empty address means "no listener", same as never calling this.
    pub fn with_callback_address(mut self, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        self.callback_address = (!addr.is_empty()).then_some(addr);
        self
    }

    /// Sets the work-available signal channel capacity.
    pub fn with_sign_capacity(mut self, capacity: usize) -> Self {
        self.sign_capacity = capacity;
        self
    }

    /// Sets the dispatch loop's fallback tick.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the callback retry backoff range in milliseconds.
    pub fn with_callback_backoff_ms(mut self, range: Range<u64>) -> Self {
        self.callback_backoff_ms = range;
        self
    }
}
