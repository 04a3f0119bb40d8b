//! Units of work executed by the pool: the [`Job`] contract, its inputs and
//! errors, the latency model, and the quiz loading job itself.

pub mod error;
pub(crate) mod guard;
pub mod input;
pub mod latency;
pub mod quiz;

use core::future::Future;
use core::pin::Pin;

pub use error::{JobError, JobErrorKind};
pub use input::JobInput;
pub use latency::LatencyModel;
pub use quiz::{Difficulty, QuizAnswer, QuizLoadJob, QuizQuestion, QuizRecord};

/// Outcome of a single job: exactly one of payload or failure.
pub type JobResult<T> = Result<T, JobError>;

pub type JobFuture<T> = Pin<Box<dyn Future<Output = JobResult<T>> + Send + 'static>>;

/// A unit of failable, time-variable work.
///
/// Implementations are shared behind an `Arc` and may be executed for many
/// inputs at once, so `execute` takes `&self` and returns an owned future.
pub trait Job: Send + Sync + 'static {
    type Output: Send + 'static;

    fn execute(&self, input: JobInput) -> JobFuture<Self::Output>;
}
