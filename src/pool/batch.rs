//! Batch barrier: gathers per-job results into submission-ordered slots and
//! applies the batch's failure policy, deadline, and interrupt.

use super::error::PoolError;
use super::slots::ResultSlots;
use super::task::{BatchAbort, FailurePolicy, ResultReceiver, SubmitOptions, SubmitOutcome};
use crate::job::{JobError, JobResult};
use crate::runtime::telemetry::Telemetry;
use std::future::pending;
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

enum StopReason {
    Drained,
    Aborted(usize),
    DeadlineElapsed,
}

pub(crate) struct BatchCollector<T> {
    batch: u64,
    slots: ResultSlots<T>,
    results_rx: ResultReceiver<T>,
    cancel: CancellationToken,
    telemetry: Arc<Telemetry>,
}

impl<T> BatchCollector<T> {
    pub(crate) fn new(
        batch: u64,
        total: usize,
        results_rx: ResultReceiver<T>,
        cancel: CancellationToken,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            batch,
            slots: ResultSlots::new(total),
            results_rx,
            cancel,
            telemetry,
        }
    }

    pub(crate) async fn collect(
        mut self,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome<T>, PoolError> {
        let deadline = options.deadline.map(|limit| Instant::now() + limit);
        let mut stop = StopReason::Drained;

        while !self.slots.is_complete() {
            tokio::select! {
                biased;
                _ = interrupted(options.interrupt.as_ref()) => {
                    self.cancel.cancel();
                    let completed = self.slots.filled();
                    let total = self.slots.len();
                    self.telemetry.record_cancelled(total.saturating_sub(completed));
                    tracing::warn!(batch = self.batch, completed, total, "batch wait interrupted");
                    return Err(PoolError::InterruptedWait { completed, total });
                }
                _ = deadline_elapsed(deadline) => {
                    self.cancel.cancel();
                    tracing::warn!(
                        batch = self.batch,
                        completed = self.slots.filled(),
                        total = self.slots.len(),
                        "batch deadline elapsed; cancelling unfinished jobs"
                    );
                    stop = StopReason::DeadlineElapsed;
                    break;
                }
                message = self.results_rx.recv() => {
                    let Some((position, result)) = message else {
                        tracing::debug!(batch = self.batch, "result channel closed before batch completed");
                        break;
                    };
                    let failed = result.is_err();
                    if !self.slots.insert(position, result) {
                        tracing::warn!(batch = self.batch, position, "discarding unexpected job result");
                        continue;
                    }
                    if failed && options.failure_policy == FailurePolicy::AbortOnFirst {
                        self.cancel.cancel();
                        tracing::info!(batch = self.batch, position, "job failed; aborting batch");
                        stop = StopReason::Aborted(position);
                        break;
                    }
                }
            }
        }

        let missing = self.slots.len().saturating_sub(self.slots.filled());
        if missing > 0 {
            self.telemetry.record_cancelled(missing);
        }

        let mut results = self
            .slots
            .into_results(|position| missing_result(&stop, position));
        let abort = match stop {
            StopReason::Aborted(index) => {
                results.truncate(index.saturating_add(1));
                match results.pop() {
                    Some(Err(error)) => Some(BatchAbort { index, error }),
                    _ => None,
                }
            }
            _ => None,
        };

        Ok(SubmitOutcome { results, abort })
    }
}

fn missing_result<T>(stop: &StopReason, position: usize) -> JobResult<T> {
    Err(match stop {
        StopReason::DeadlineElapsed => {
            JobError::timed_out(format!("job {position} did not finish before the batch deadline"))
        }
        StopReason::Aborted(index) => {
            JobError::cancelled(format!("batch aborted after job {index} failed"))
        }
        StopReason::Drained => {
            JobError::cancelled("worker pool shut down before the job completed")
        }
    })
}

pub(crate) async fn interrupted(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => pending().await,
    }
}

pub(crate) async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
