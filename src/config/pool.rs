//! Pool configuration: the immutable option snapshot captured at construction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::TaskError;
use crate::core::task::{ErrorCallback, ResultCallback};

/// Default inbound queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 1_000_000;
/// Default autoscale evaluation period.
const DEFAULT_ADJUST_INTERVAL: Duration = Duration::from_secs(1);

/// Construction-time options for a [`WorkerPool`](crate::core::pool::WorkerPool).
///
/// The scalar knobs round-trip through serde (callbacks are skipped), so a
/// deployment can load sizing from JSON and attach callbacks in code:
///
/// ```
/// use tidepool::config::PoolConfig;
///
/// let config = PoolConfig::<u64>::from_json_str(
///     r#"{
///         "min_workers": 2,
///         "queue_capacity": 4096,
///         "retry_count": 1,
///         "adjust_interval": { "secs": 0, "nanos": 250000000 }
///     }"#,
/// )
/// .unwrap()
/// .with_result_callback(|value| println!("done: {value}"));
///
/// assert_eq!(config.queue_capacity(), 4096);
/// ```
///
/// Defaults: `min_workers` equal to the pool maximum, queue capacity
/// 1,000,000, no retries, no per-attempt timeout, adjust interval 1 second,
/// no callbacks. Values are validated by `WorkerPool::new`, not here.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""), default)]
pub struct PoolConfig<T> {
    /// Floor for autoscale-down and initial worker count. `None` means
    /// "equal to the pool's `max_workers`".
    pub(crate) min_workers: Option<usize>,
    /// Inbound queue bound; submission blocks when it is reached.
    pub(crate) queue_capacity: usize,
    /// Additional attempts after a first failed attempt.
    pub(crate) retry_count: u32,
    /// Per-attempt deadline. `None` disables the deadline race entirely.
    pub(crate) timeout: Option<Duration>,
    /// Autoscale evaluation period.
    pub(crate) adjust_interval: Duration,
    /// Invoked with each task's value on eventual success.
    #[serde(skip)]
    pub(crate) result_callback: Option<ResultCallback<T>>,
    /// Invoked with the terminal error once retries are exhausted.
    #[serde(skip)]
    pub(crate) error_callback: Option<ErrorCallback>,
}

impl<T> Default for PoolConfig<T> {
    fn default() -> Self {
        Self {
            min_workers: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_count: 0,
            timeout: None,
            adjust_interval: DEFAULT_ADJUST_INTERVAL,
            result_callback: None,
            error_callback: None,
        }
    }
}

impl<T> Clone for PoolConfig<T> {
    fn clone(&self) -> Self {
        Self {
            min_workers: self.min_workers,
            queue_capacity: self.queue_capacity,
            retry_count: self.retry_count,
            timeout: self.timeout,
            adjust_interval: self.adjust_interval,
            result_callback: self.result_callback.clone(),
            error_callback: self.error_callback.clone(),
        }
    }
}

impl<T> fmt::Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("min_workers", &self.min_workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("retry_count", &self.retry_count)
            .field("timeout", &self.timeout)
            .field("adjust_interval", &self.adjust_interval)
            .field("result_callback", &self.result_callback.is_some())
            .field("error_callback", &self.error_callback.is_some())
            .finish()
    }
}

impl<T> PoolConfig<T> {
    /// Create a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the autoscale floor and initial worker count.
    #[must_use]
    pub fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = Some(min_workers);
        self
    }

    /// Set the inbound queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the number of additional attempts after a first failure.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the autoscale evaluation period.
    #[must_use]
    pub fn with_adjust_interval(mut self, adjust_interval: Duration) -> Self {
        self.adjust_interval = adjust_interval;
        self
    }

    /// Attach the success callback.
    #[must_use]
    pub fn with_result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.result_callback = Some(Arc::new(callback));
        self
    }

    /// Attach the permanent-failure callback.
    #[must_use]
    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(TaskError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Configured autoscale floor, if one was set explicitly.
    #[must_use]
    pub const fn min_workers(&self) -> Option<usize> {
        self.min_workers
    }

    /// Configured inbound queue capacity.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Configured additional attempts after a first failure.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Configured per-attempt deadline, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Configured autoscale evaluation period.
    #[must_use]
    pub const fn adjust_interval(&self) -> Duration {
        self.adjust_interval
    }

    /// Validate this configuration against the pool's worker ceiling.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming the first invalid value.
    pub fn validate(&self, max_workers: usize) -> Result<(), String> {
        if max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if let Some(min) = self.min_workers {
            if min == 0 {
                return Err("min_workers must be greater than 0".into());
            }
            if min > max_workers {
                return Err(format!(
                    "min_workers ({min}) must not exceed max_workers ({max_workers})"
                ));
            }
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err("timeout must be greater than zero".into());
            }
        }
        if self.adjust_interval.is_zero() {
            return Err("adjust_interval must be greater than zero".into());
        }
        Ok(())
    }

    /// Parse the scalar knobs from a JSON string.
    ///
    /// Missing fields keep their defaults; callbacks cannot be expressed in
    /// JSON and start out unset.
    ///
    /// # Errors
    ///
    /// Returns the serde parse error rendered as a string.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))
    }
}
