//! Error types for pool construction and task execution.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the pool's public surface.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Construction arguments failed validation; the pool was not created.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
    /// The pool has begun shutdown and no longer accepts submissions.
    #[error("pool has been released")]
    Released,
}

/// Terminal outcome of a task whose retries are exhausted.
///
/// Delivered to the error callback only; task failures never propagate to the
/// dispatcher or autoscaler.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task itself reported an error on its final attempt.
    #[error("task failed: {0}")]
    Failed(anyhow::Error),
    /// The final attempt exceeded the configured per-attempt deadline.
    #[error("task attempt exceeded {0:?} deadline")]
    TimedOut(Duration),
    /// The task panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Result type produced by task closures.
pub type TaskResult<T> = Result<T, anyhow::Error>;
