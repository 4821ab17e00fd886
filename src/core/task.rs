//! Task types and single-attempt execution.
//!
//! A task is an opaque zero-argument callable producing a value or an error.
//! Execution policy (deadline racing, panic containment) lives here; the
//! retry loop that drives repeated attempts lives with the worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::debug;

use super::error::{TaskError, TaskResult};

/// A unit of work submitted to the pool.
///
/// Tasks are shared closures rather than one-shot ones: the retry policy
/// re-invokes the same callable, and a deadline-raced attempt may still be
/// running (abandoned) while the next attempt starts.
pub type Task<T> = Arc<dyn Fn() -> TaskResult<T> + Send + Sync + 'static>;

/// Callback invoked with a task's value on eventual success.
pub type ResultCallback<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Callback invoked with a task's terminal error once retries are exhausted.
pub type ErrorCallback = Arc<dyn Fn(TaskError) + Send + Sync + 'static>;

/// Run one attempt on the current thread, containing panics.
pub(crate) fn run_attempt<T>(task: &Task<T>) -> Result<T, TaskError> {
    match panic::catch_unwind(AssertUnwindSafe(task.as_ref())) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskError::Failed(err)),
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Run one attempt raced against a deadline.
///
/// The attempt executes on a scratch thread. If the deadline passes first the
/// attempt is abandoned (it finishes in the background and its result is
/// discarded) and the task is charged a timeout failure.
pub(crate) fn run_deadlined<T>(task: &Task<T>, deadline: Duration) -> Result<T, TaskError>
where
    T: Send + 'static,
{
    let (done_tx, done_rx) = bounded(1);
    let attempt = Arc::clone(task);
    let spawned = thread::Builder::new()
        .name("tide-attempt".into())
        .spawn(move || {
            let _ = done_tx.send(run_attempt(&attempt));
        });
    if let Err(err) = spawned {
        return Err(TaskError::Failed(err.into()));
    }

    match done_rx.recv_timeout(deadline) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            debug!(?deadline, "attempt abandoned past deadline");
            Err(TaskError::TimedOut(deadline))
        }
        Err(RecvTimeoutError::Disconnected) => Err(TaskError::Panicked(
            "attempt thread exited without a result".into(),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn task_of<T, F>(f: F) -> Task<T>
    where
        F: Fn() -> TaskResult<T> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    #[test]
    fn attempt_returns_value() {
        let task = task_of(|| Ok(7));
        assert_eq!(run_attempt(&task).ok(), Some(7));
    }

    #[test]
    fn attempt_surfaces_task_error() {
        let task: Task<i32> = task_of(|| Err(anyhow::anyhow!("boom")));
        match run_attempt(&task) {
            Err(TaskError::Failed(err)) => assert_eq!(err.to_string(), "boom"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn attempt_contains_panic() {
        let task: Task<i32> = task_of(|| panic!("kaboom"));
        match run_attempt(&task) {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn deadlined_attempt_completes_in_time() {
        let task = task_of(|| Ok("done"));
        let outcome = run_deadlined(&task, Duration::from_secs(5));
        assert_eq!(outcome.ok(), Some("done"));
    }

    #[test]
    fn deadlined_attempt_times_out_promptly() {
        let task: Task<()> = task_of(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        let started = Instant::now();
        let outcome = run_deadlined(&task, Duration::from_millis(20));
        assert!(matches!(outcome, Err(TaskError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn deadlined_attempt_reports_panic_not_disconnect() {
        let task: Task<i32> = task_of(|| panic!("late panic"));
        match run_deadlined(&task, Duration::from_secs(5)) {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "late panic"),
            other => panic!("expected Panicked, got {other:?}"),
        }
    }
}
