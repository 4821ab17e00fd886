//! Pool runtime: workers, dispatch, autoscaling, and task execution.

pub mod error;
pub mod pool;
pub mod task;

mod autoscaler;
mod dispatcher;
mod worker;

pub use error::{PoolError, TaskError, TaskResult};
pub use pool::WorkerPool;
pub use task::{ErrorCallback, ResultCallback, Task};
