//! Autoscaling loop: periodic grow/shrink of the worker arena.
//!
//! Each tick evaluates at most one action under the pool lock. Growth
//! doubles the worker count (capped at the maximum) when the backlog
//! exceeds three quarters of the current count; shrink halves the excess
//! above the minimum (rounding up), and only when every worker is idle.

use std::sync::Arc;

use crossbeam_channel::{select, tick, Receiver, Sender, TryRecvError};
use tracing::{debug, info};

use super::pool::PoolShared;
use super::task::Task;
use super::worker::WorkerHandle;

/// Run the autoscaler until the cancellation channel closes.
///
/// `backlog` is a handle on the inbound queue kept purely for length
/// sampling; it is dropped when this loop exits, which is what finally
/// closes the queue during shutdown.
pub(crate) fn run<T>(shared: &Arc<PoolShared<T>>, backlog: &Sender<Task<T>>, cancel: &Receiver<()>)
where
    T: Send + 'static,
{
    let ticker = tick(shared.config.adjust_interval);
    debug!("autoscaler started");
    loop {
        select! {
            recv(ticker) -> _ => {
                // Cancellation outranks the timer when both are ready.
                if matches!(cancel.try_recv(), Err(TryRecvError::Disconnected)) {
                    break;
                }
                evaluate_tick(shared, backlog);
            }
            recv(cancel) -> _ => break,
        }
    }
    debug!("autoscaler stopped");
}

/// Evaluate one tick: grow, shrink, or do nothing. Grow takes precedence.
fn evaluate_tick<T>(shared: &Arc<PoolShared<T>>, backlog: &Sender<Task<T>>)
where
    T: Send + 'static,
{
    let mut removed = Vec::new();
    let mut adjusted = false;
    {
        let mut core = shared.core.lock();
        if core.closed {
            return;
        }
        let count = core.workers.len();
        let queued = backlog.len();

        if queued > count * 3 / 4 && count < shared.max_workers {
            let target = grow_target(count, shared.max_workers);
            for index in count..target {
                core.workers.push(WorkerHandle::spawn(index, Arc::clone(shared)));
                core.idle.push(index);
            }
            info!(from = count, to = target, queued, "scaled up");
            adjusted = true;
        } else if queued == 0 && core.idle.len() == count && count > shared.min_workers {
            // Safe only because every worker is idle: sorting the stack and
            // truncating both collections together drops the highest indices
            // and keeps the arena dense.
            let keep = count - shrink_count(count, shared.min_workers);
            core.idle.sort_unstable();
            core.idle.truncate(keep);
            removed = core.workers.split_off(keep);
            info!(from = count, to = keep, "scaled down");
            adjusted = true;
        }
    }
    if adjusted {
        shared.idle_cond.notify_all();
    }
    // Removed workers were idle; closing their queues ends their loops
    // immediately, so joining outside the lock is quick.
    for handle in removed {
        handle.join();
    }
}

/// Doubled worker count, capped at the maximum.
pub(crate) fn grow_target(count: usize, max_workers: usize) -> usize {
    count.saturating_mul(2).min(max_workers)
}

/// Half the excess above the minimum, rounding up.
pub(crate) fn shrink_count(count: usize, min_workers: usize) -> usize {
    (count - min_workers).div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::{grow_target, shrink_count};

    #[test]
    fn grow_doubles_until_capped() {
        assert_eq!(grow_target(1, 8), 2);
        assert_eq!(grow_target(2, 8), 4);
        assert_eq!(grow_target(4, 8), 8);
        assert_eq!(grow_target(5, 8), 8);
        assert_eq!(grow_target(8, 8), 8);
        assert_eq!(grow_target(1, 1), 1);
    }

    #[test]
    fn shrink_halves_excess_rounding_up() {
        assert_eq!(shrink_count(2, 1), 1);
        assert_eq!(shrink_count(3, 1), 1);
        assert_eq!(shrink_count(4, 1), 2);
        assert_eq!(shrink_count(10, 4), 3);
        assert_eq!(shrink_count(5, 4), 1);
    }

    #[test]
    fn repeated_shrink_reaches_minimum() {
        let mut count = 16;
        let mut ticks = 0;
        while count > 1 {
            count -= shrink_count(count, 1);
            ticks += 1;
        }
        assert_eq!(count, 1);
        assert!(ticks <= 5);
    }
}
