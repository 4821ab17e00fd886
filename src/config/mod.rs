//! Configuration models for pool sizing and task policy.

pub mod pool;

pub use pool::PoolConfig;
