use super::result::{BatchResult, RunMode};
use crate::job::guard::execute_guarded;
use crate::job::{Job, JobError, JobInput};
use crate::pool::batch::{deadline_elapsed, interrupted};
use crate::pool::{BatchAbort, FailurePolicy, PoolError, SubmitOptions, WorkerPool};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;

/// Runs batches of one job type either on the shared [`WorkerPool`] or one
/// at a time on the calling task.
///
/// The runner borrows the pool; it never shuts it down.
pub struct BatchRunner<J: Job> {
    pool: Arc<WorkerPool>,
    job: Arc<J>,
    options: SubmitOptions,
}

impl<J: Job> BatchRunner<J> {
    pub fn new(pool: Arc<WorkerPool>, job: Arc<J>) -> Self {
        Self {
            pool,
            job,
            options: SubmitOptions::default(),
        }
    }

    /// Failure policy, deadline, and interrupt applied to every batch.
    pub fn with_options(mut self, options: SubmitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Submits one job per input to the pool and waits for the whole batch.
    pub async fn run_concurrent(
        &self,
        inputs: &[JobInput],
    ) -> Result<BatchResult<J::Output>, PoolError> {
        let mode = RunMode::Concurrent;
        if inputs.is_empty() {
            if self.pool.is_closed() {
                return Err(PoolError::PoolClosed);
            }
            return Ok(self.finish(BatchResult::empty(mode)));
        }

        tracing::info!(%mode, jobs = inputs.len(), workers = self.pool.worker_count(), "starting batch");
        let started = Instant::now();
        let jobs = inputs
            .iter()
            .cloned()
            .map(|input| (input, self.job.clone()))
            .collect();
        let outcome = self.pool.submit_all_with(jobs, self.options.clone()).await?;

        Ok(self.finish(BatchResult {
            mode,
            elapsed: started.elapsed(),
            results: outcome.results,
            abort: outcome.abort,
        }))
    }

    /// Runs the inputs in order on the calling task, without touching the
    /// pool's workers.
    pub async fn run_sequential(
        &self,
        inputs: &[JobInput],
    ) -> Result<BatchResult<J::Output>, PoolError> {
        let mode = RunMode::Sequential;
        if inputs.is_empty() {
            return Ok(self.finish(BatchResult::empty(mode)));
        }

        tracing::info!(%mode, jobs = inputs.len(), "starting batch");
        let telemetry = self.pool.telemetry();
        telemetry.record_submitted(inputs.len());

        let started = Instant::now();
        let deadline = self.options.deadline.map(|limit| started + limit);
        let total = inputs.len();
        let mut results = Vec::with_capacity(total);
        let mut abort = None;

        let run = async {
            for input in inputs.iter().cloned() {
                let position = results.len();
                let ordinal = input.ordinal();
                tokio::select! {
                    biased;
                    _ = interrupted(self.options.interrupt.as_ref()) => {
                        telemetry.record_cancelled(total - position);
                        tracing::warn!(completed = position, total, "batch wait interrupted");
                        return Err(PoolError::InterruptedWait { completed: position, total });
                    }
                    _ = deadline_elapsed(deadline) => {
                        tracing::warn!(
                            completed = position,
                            total,
                            "batch deadline elapsed; skipping unfinished jobs"
                        );
                        break;
                    }
                    result = execute_guarded(self.job.as_ref(), input) => {
                        telemetry.record_job_outcome(result.is_ok());
                        match result {
                            Err(error) if self.options.failure_policy == FailurePolicy::AbortOnFirst => {
                                tracing::info!(quiz = ordinal, position, error = %error, "job failed; aborting batch");
                                abort = Some(BatchAbort { index: position, error });
                                break;
                            }
                            Err(error) => {
                                tracing::warn!(quiz = ordinal, position, error = %error, "job failed");
                                results.push(Err(error));
                            }
                            Ok(output) => results.push(Ok(output)),
                        }
                    }
                }
            }
            Ok(())
        };
        run.instrument(tracing::info_span!("caller")).await?;

        telemetry.record_cancelled(total - results.len() - usize::from(abort.is_some()));
        if abort.is_none() {
            for position in results.len()..total {
                results.push(Err(JobError::timed_out(format!(
                    "job {position} did not finish before the batch deadline"
                ))));
            }
        }

        Ok(self.finish(BatchResult {
            mode,
            elapsed: started.elapsed(),
            results,
            abort,
        }))
    }

    fn finish(&self, batch: BatchResult<J::Output>) -> BatchResult<J::Output> {
        self.pool.telemetry().record_batch(batch.mode);
        tracing::info!(
            mode = %batch.mode,
            elapsed_ms = batch.elapsed_millis(),
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            aborted = batch.is_aborted(),
            "batch complete"
        );
        batch
    }
}
