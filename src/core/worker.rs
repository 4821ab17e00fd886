//! Worker execution units: a private handoff channel plus a named OS thread.
//!
//! A worker owns nothing but its receive loop. Policy (retry, deadline,
//! callbacks) is read through the shared pool state; completion is announced
//! by pushing the worker's own index back onto the idle stack.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use super::error::TaskError;
use super::pool::PoolShared;
use super::task::{self, Task};

/// Handle to one worker slot in the pool's arena.
///
/// Dropping the handle closes the worker's private queue, which terminates
/// its loop once any in-flight task finishes.
pub(crate) struct WorkerHandle<T>
where
    T: Send + 'static,
{
    /// Sending side of the worker's capacity-1 private queue.
    feed: Sender<Task<T>>,
    /// The worker's OS thread.
    thread: JoinHandle<()>,
}

impl<T> WorkerHandle<T>
where
    T: Send + 'static,
{
    /// Spawn a worker for arena slot `index`.
    ///
    /// The caller registers the index on the idle stack under the pool lock;
    /// the worker itself only re-registers after completing a task.
    pub(crate) fn spawn(index: usize, shared: Arc<PoolShared<T>>) -> Self {
        let (feed, tasks) = bounded(1);
        let thread = thread::Builder::new()
            .name(format!("tide-worker-{index}"))
            .spawn(move || worker_loop(index, &shared, &tasks))
            .expect("failed to spawn worker thread");
        Self { feed, thread }
    }

    /// Clone the sending side of the worker's private queue.
    pub(crate) fn feed(&self) -> Sender<Task<T>> {
        self.feed.clone()
    }

    /// Close the private queue and join the worker thread.
    pub(crate) fn join(self) {
        let Self { feed, thread } = self;
        drop(feed);
        if thread.join().is_err() {
            warn!("worker thread panicked during teardown");
        }
    }
}

/// The worker loop: recv, execute under policy, deliver, re-register.
fn worker_loop<T>(index: usize, shared: &PoolShared<T>, tasks: &Receiver<Task<T>>)
where
    T: Send + 'static,
{
    debug!(worker = index, "worker started");
    loop {
        // Blocks until a task is handed off or the queue is closed by a
        // shrink or by shutdown.
        let task = match tasks.recv() {
            Ok(task) => task,
            Err(_) => break,
        };

        match run_task(&task, shared) {
            Ok(value) => {
                if let Some(callback) = shared.config.result_callback.as_deref() {
                    callback(value);
                }
            }
            Err(err) => {
                warn!(worker = index, error = %err, "task failed permanently");
                if let Some(callback) = shared.config.error_callback.as_deref() {
                    callback(err);
                }
            }
        }

        // Re-register before the pending count drops so quiescence implies
        // a fully idle registry.
        shared.release_worker(index);
        shared.pending.fetch_sub(1, Ordering::Release);
    }
    debug!(worker = index, "worker stopped");
}

/// Drive a task through the configured retry/deadline policy.
fn run_task<T>(task: &Task<T>, shared: &PoolShared<T>) -> Result<T, TaskError>
where
    T: Send + 'static,
{
    let retries = shared.config.retry_count;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match shared.config.timeout {
            Some(deadline) => task::run_deadlined(task, deadline),
            None => task::run_attempt(task),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= retries => {
                debug!(attempt, error = %err, "task attempt failed; retrying");
            }
            Err(err) => return Err(err),
        }
    }
}
