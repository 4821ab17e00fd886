//! Dispatch loop: matches queued tasks to idle workers.

use std::sync::atomic::Ordering;

use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

use super::pool::PoolShared;
use super::task::Task;

/// Drain the inbound queue, forwarding each task to a claimed idle worker.
///
/// Tasks leave the queue in submission order; the claim blocks cooperatively
/// on the registry condvar when no worker is free. The loop ends when the
/// inbound queue is closed and fully drained. Sizing decisions never happen
/// here.
pub(crate) fn run<T>(shared: &PoolShared<T>, inbound: &Receiver<Task<T>>)
where
    T: Send + 'static,
{
    debug!("dispatcher started");
    loop {
        let task = match inbound.recv() {
            Ok(task) => task,
            Err(_) => break,
        };

        let Some(feed) = shared.claim_worker() else {
            // The pool was torn down non-gracefully; nothing will ever be
            // claimable again, so the backlog is discarded.
            let discarded = 1 + inbound.try_iter().count();
            shared.pending.fetch_sub(discarded, Ordering::Release);
            warn!(discarded, "pool torn down with tasks still queued; discarding");
            break;
        };

        // A claimed worker is idle, so its capacity-1 queue is empty and
        // this handoff does not block.
        if feed.send(task).is_err() {
            shared.pending.fetch_sub(1, Ordering::Release);
            error!("claimed worker queue closed before handoff; task lost");
        }
    }
    debug!("dispatcher stopped");
}
