//! # Tidepool
//!
//! A self-scaling worker pool for CPU-bound and blocking workloads.
//!
//! This library runs submitted tasks on a pool of dedicated OS threads that
//! grows under load and shrinks back when idle. Tasks flow through a bounded
//! inbound queue into a dispatcher, which hands each one to an idle worker;
//! a background autoscaler watches the backlog and resizes the pool between
//! a configured floor and ceiling.
//!
//! ## Key Features
//!
//! - **Self-scaling**: worker count doubles while the backlog outpaces the
//!   pool and halves back toward the floor once everything is idle
//! - **Bounded submission**: the inbound queue has a fixed capacity and
//!   `submit` blocks when it is full, so producers feel backpressure instead
//!   of exhausting memory
//! - **Warm-worker reuse**: idle workers are claimed most-recently-parked
//!   first, keeping a small hot set busy under light load
//! - **Per-task policy**: optional retry count and per-attempt timeout,
//!   applied uniformly to every task
//! - **Callback delivery**: task results and terminal failures are pushed
//!   through caller-supplied callbacks, keeping submission fire-and-forget
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tidepool::{PoolConfig, WorkerPool};
//!
//! let completed = Arc::new(AtomicUsize::new(0));
//! let sink = Arc::clone(&completed);
//!
//! let pool = WorkerPool::new(
//!     8,
//!     PoolConfig::new()
//!         .with_min_workers(2)
//!         .with_retry_count(1)
//!         .with_timeout(Duration::from_secs(30))
//!         .with_result_callback(move |_: u64| {
//!             sink.fetch_add(1, Ordering::Relaxed);
//!         }),
//! )
//! .unwrap();
//!
//! for n in 0..100u64 {
//!     pool.submit(move || Ok(n * n)).unwrap();
//! }
//!
//! // Block until every task has completed and all workers are idle.
//! pool.wait();
//! assert_eq!(completed.load(Ordering::Relaxed), 100);
//!
//! // Graceful shutdown: drains the queue, then joins every thread.
//! pool.release();
//! ```
//!
//! For complete examples, see `tests/worker_pool_test.rs` and
//! `tests/autoscale_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for pool sizing and task policy.
pub mod config;
/// Pool runtime: workers, dispatch, autoscaling, and task execution.
pub mod core;
/// Shared utilities.
pub mod util;

pub use crate::config::PoolConfig;
pub use crate::core::{PoolError, TaskError, TaskResult, WorkerPool};
