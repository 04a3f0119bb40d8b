//! Batch orchestration: concurrent runs on the shared pool and the
//! in-caller sequential baseline, both timed and order-preserving.

pub mod result;
pub mod runner;

pub use result::{BatchResult, BatchSummary, RunMode};
pub use runner::BatchRunner;
