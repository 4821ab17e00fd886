//! The pool aggregate: worker arena, free-worker registry, and lifecycle.
//!
//! # Design
//!
//! - **One lock**: the arena and the idle stack live under a single
//!   `parking_lot::Mutex`, so registry size and worker count are always
//!   observed together. Nothing blocks while holding it except the condvar
//!   wait itself.
//! - **Arena by index**: workers are addressed by their position in a dense
//!   `Vec`; growth appends, shrink truncates the tail, and handles are
//!   resolved by index under the lock on every claim, never cached across a
//!   resize.
//! - **Clean shutdown**: dropping the inbound sender lets the dispatcher
//!   drain out; dropping a worker's private sender ends its loop.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use super::autoscaler;
use super::dispatcher;
use super::error::{PoolError, TaskResult};
use super::task::Task;
use super::worker::WorkerHandle;
use crate::config::PoolConfig;

/// Interval at which [`WorkerPool::wait`] re-samples pool state.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// State guarded by the pool-wide lock.
pub(crate) struct PoolCore<T>
where
    T: Send + 'static,
{
    /// Dense arena of live workers; a worker's index is its arena position.
    pub(crate) workers: Vec<WorkerHandle<T>>,
    /// LIFO stack of idle worker indices (the free-worker registry).
    pub(crate) idle: Vec<usize>,
    /// Set at teardown: claims fail fast and late releases are ignored.
    pub(crate) closed: bool,
}

/// State shared by the pool handle, the workers, and both control loops.
pub(crate) struct PoolShared<T>
where
    T: Send + 'static,
{
    /// The single pool-wide lock.
    pub(crate) core: Mutex<PoolCore<T>>,
    /// Signaled on registry changes: one waiter per released index,
    /// broadcast after a resize.
    pub(crate) idle_cond: Condvar,
    /// Immutable option snapshot.
    pub(crate) config: PoolConfig<T>,
    /// Worker ceiling.
    pub(crate) max_workers: usize,
    /// Worker floor (resolved; defaults to the ceiling).
    pub(crate) min_workers: usize,
    /// Tasks submitted but not yet completed or discarded.
    pub(crate) pending: AtomicUsize,
}

impl<T> PoolShared<T>
where
    T: Send + 'static,
{
    /// Block until a worker is idle, claim it (LIFO), and return the sending
    /// side of its private queue.
    ///
    /// Returns `None` only after a non-graceful teardown has closed the pool.
    pub(crate) fn claim_worker(&self) -> Option<Sender<Task<T>>> {
        let mut core = self.core.lock();
        loop {
            if core.closed {
                return None;
            }
            if let Some(index) = core.idle.pop() {
                return Some(core.workers[index].feed());
            }
            self.idle_cond.wait(&mut core);
        }
    }

    /// Return a worker index to the registry and wake one waiter.
    pub(crate) fn release_worker(&self, index: usize) {
        let mut core = self.core.lock();
        if core.closed {
            return;
        }
        core.idle.push(index);
        drop(core);
        self.idle_cond.notify_one();
    }
}

/// A self-scaling worker pool.
///
/// The pool owns a bounded inbound queue, a dense arena of worker threads, a
/// dispatcher thread that matches queued tasks to idle workers, and an
/// autoscaler thread that doubles the worker count under backlog and halves
/// the excess when fully idle. Task outcomes are delivered through the
/// callbacks configured on [`PoolConfig`]; submission itself only reports
/// lifecycle errors.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use tidepool::{PoolConfig, WorkerPool};
///
/// let total = Arc::new(AtomicUsize::new(0));
/// let sink = Arc::clone(&total);
///
/// let pool = WorkerPool::new(
///     4,
///     PoolConfig::new()
///         .with_min_workers(1)
///         .with_result_callback(move |n: usize| {
///             sink.fetch_add(n, Ordering::Relaxed);
///         }),
/// )
/// .unwrap();
///
/// for _ in 0..10 {
///     pool.submit(|| Ok(1)).unwrap();
/// }
/// pool.wait();
/// pool.release();
/// assert_eq!(total.load(Ordering::Relaxed), 10);
/// ```
pub struct WorkerPool<T>
where
    T: Send + 'static,
{
    /// Shared state: arena, registry, policy, quiescence counter.
    shared: Arc<PoolShared<T>>,
    /// Inbound queue sender. `None` once shutdown begins; dropping it closes
    /// the queue and lets the dispatcher drain out.
    task_tx: Mutex<Option<Sender<Task<T>>>>,
    /// Autoscaler cancellation signal; dropped to cancel.
    cancel_tx: Mutex<Option<Sender<()>>>,
    /// Dispatcher thread handle.
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    /// Autoscaler thread handle.
    autoscaler: Mutex<Option<JoinHandle<()>>>,
    /// One-shot guard shared by `release` and `Drop`.
    released: AtomicBool,
}

impl<T> WorkerPool<T>
where
    T: Send + 'static,
{
    /// Create a pool with at most `max_workers` workers.
    ///
    /// `min_workers` workers (defaulting to `max_workers`) are created up
    /// front and registered idle; the dispatcher and autoscaler threads
    /// start immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the configuration fails
    /// validation. Nothing is spawned in that case.
    pub fn new(max_workers: usize, config: PoolConfig<T>) -> Result<Self, PoolError> {
        config.validate(max_workers).map_err(PoolError::InvalidConfig)?;

        let min_workers = config.min_workers().unwrap_or(max_workers);
        let queue_capacity = config.queue_capacity();
        let (task_tx, task_rx) = bounded(queue_capacity);
        let (cancel_tx, cancel_rx) = bounded(1);

        let shared = Arc::new(PoolShared {
            core: Mutex::new(PoolCore {
                workers: Vec::with_capacity(max_workers),
                idle: Vec::with_capacity(max_workers),
                closed: false,
            }),
            idle_cond: Condvar::new(),
            config,
            max_workers,
            min_workers,
            pending: AtomicUsize::new(0),
        });

        {
            let mut core = shared.core.lock();
            for index in 0..min_workers {
                core.workers
                    .push(WorkerHandle::spawn(index, Arc::clone(&shared)));
                core.idle.push(index);
            }
        }

        let dispatcher = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("tide-dispatch".into())
                .spawn(move || dispatcher::run(&shared, &task_rx))
                .expect("failed to spawn dispatcher thread")
        };

        let autoscaler = {
            let shared = Arc::clone(&shared);
            let backlog = task_tx.clone();
            thread::Builder::new()
                .name("tide-scale".into())
                .spawn(move || autoscaler::run(&shared, &backlog, &cancel_rx))
                .expect("failed to spawn autoscaler thread")
        };

        info!(max_workers, min_workers, queue_capacity, "worker pool started");

        Ok(Self {
            shared,
            task_tx: Mutex::new(Some(task_tx)),
            cancel_tx: Mutex::new(Some(cancel_tx)),
            dispatcher: Mutex::new(Some(dispatcher)),
            autoscaler: Mutex::new(Some(autoscaler)),
            released: AtomicBool::new(false),
        })
    }

    /// Submit a task.
    ///
    /// Blocks while the inbound queue is at capacity (backpressure); tasks
    /// are never silently dropped. The task's outcome is delivered through
    /// the configured callbacks, not through this call.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Released`] once shutdown has begun.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Fn() -> TaskResult<T> + Send + Sync + 'static,
    {
        // Clone the sender out of the guard so backpressure never blocks
        // while the option lock is held.
        let inbound = {
            let guard = self.task_tx.lock();
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => return Err(PoolError::Released),
            }
        };

        let task: Task<T> = Arc::new(task);
        self.shared.pending.fetch_add(1, Ordering::Relaxed);
        if inbound.send(task).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::Released);
        }
        Ok(())
    }

    /// Block until the pool is quiescent: every submitted task has completed
    /// and every worker is idle.
    ///
    /// Polls at a coarse fixed interval. Quiescence is a point-in-time
    /// observation; a concurrent submitter can void it immediately after
    /// this returns.
    pub fn wait(&self) {
        loop {
            let pending = self.shared.pending.load(Ordering::Acquire);
            let settled = {
                let core = self.shared.core.lock();
                core.idle.len() == core.workers.len()
            };
            if pending == 0 && settled {
                break;
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Shut down gracefully.
    ///
    /// Closes the inbound queue (no further submissions), lets the
    /// dispatcher drain every already-queued task, cancels and joins both
    /// control loops, waits until every worker is idle, then closes each
    /// worker's private queue and joins its thread. In-flight tasks are
    /// never aborted.
    ///
    /// One-shot: later calls (and `Drop`) return immediately.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("releasing worker pool");

        // Closing the inbound queue stops submissions and lets the
        // dispatcher run dry; the cancel channel stops the autoscaler at its
        // next select. The autoscaler is joined first because it holds a
        // queue handle for backlog sampling, and the queue only fully closes
        // once that handle is gone.
        *self.task_tx.lock() = None;
        *self.cancel_tx.lock() = None;
        if let Some(handle) = self.autoscaler.lock().take() {
            if handle.join().is_err() {
                warn!("autoscaler thread panicked");
            }
        }
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!("dispatcher thread panicked");
            }
        }

        // With the dispatcher gone no further claims can happen, so idle
        // count reaching the current worker count means truly quiescent.
        // Waiting on the current count, not the configured minimum, keeps
        // this from hanging when the pool never shrank back down.
        let workers = {
            let mut core = self.shared.core.lock();
            while core.idle.len() != core.workers.len() {
                self.shared.idle_cond.wait(&mut core);
            }
            core.closed = true;
            core.idle.clear();
            mem::take(&mut core.workers)
        };

        let count = workers.len();
        for handle in workers {
            handle.join();
        }
        info!(workers = count, "worker pool released");
    }

    /// Number of workers currently executing a task.
    #[must_use]
    pub fn running(&self) -> usize {
        let core = self.shared.core.lock();
        core.workers.len().saturating_sub(core.idle.len())
    }

    /// Current worker count. Grows and shrinks with the autoscaler; 0 after
    /// release.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.core.lock().workers.len()
    }

    /// Configured inbound queue capacity.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.shared.config.queue_capacity()
    }
}

impl<T> fmt::Debug for WorkerPool<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_workers", &self.shared.max_workers)
            .field("min_workers", &self.shared.min_workers)
            .field("queue_capacity", &self.shared.config.queue_capacity())
            .field("released", &self.released.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T> Drop for WorkerPool<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        // Non-graceful teardown: close every channel and detach the
        // threads. The dispatcher discards any backlog on its way out;
        // workers finish their current task and exit.
        *self.task_tx.lock() = None;
        *self.cancel_tx.lock() = None;
        {
            let mut core = self.shared.core.lock();
            core.closed = true;
            core.idle.clear();
            core.workers.clear();
        }
        self.shared.idle_cond.notify_all();
        debug!("worker pool dropped without release; threads detached");
    }
}
