//! Fixed-size worker pool: submission queue, worker tasks, order-preserving
//! result collection, and lifecycle management.

pub(crate) mod batch;
pub mod error;
mod lifecycle;
pub mod slots;
pub mod task;
mod worker;
pub mod worker_pool;


pub use error::PoolError;
pub use lifecycle::ShutdownOutcome;
pub use slots::ResultSlots;
pub use task::{BatchAbort, FailurePolicy, SubmitOptions, SubmitOutcome};
pub use worker::WorkerActivityTracker;
pub use worker_pool::{WorkerPool, DEFAULT_WORKER_COUNT};
