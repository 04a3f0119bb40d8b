//! Panic and cancellation guards shared by the pool workers and the
//! sequential runner.

use super::{Job, JobError, JobInput, JobResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio_util::sync::CancellationToken;

/// Outcome of a job execution that can be interrupted by a cancellation token.
pub(crate) enum JobDecision<T> {
    Finished(JobResult<T>),
    Cancelled,
}

/// Runs `job` for `input`, converting a panic into a `Panicked` failure.
///
/// Covers both the synchronous body of [`Job::execute`] and the returned future.
pub(crate) async fn execute_guarded<J: Job>(job: &J, input: JobInput) -> JobResult<J::Output> {
    let future = match panic::catch_unwind(AssertUnwindSafe(|| job.execute(input))) {
        Ok(future) => future,
        Err(panic_payload) => {
            return Err(JobError::panicked(panic_message(panic_payload.as_ref())))
        }
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic_payload) => Err(JobError::panicked(panic_message(panic_payload.as_ref()))),
    }
}

/// Like [`execute_guarded`], but drops the job future as soon as `cancel` fires.
pub(crate) async fn execute_cancellable<J: Job>(
    job: &J,
    input: JobInput,
    cancel: &CancellationToken,
) -> JobDecision<J::Output> {
    if cancel.is_cancelled() {
        return JobDecision::Cancelled;
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => JobDecision::Cancelled,
        result = execute_guarded(job, input) => JobDecision::Finished(result),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
