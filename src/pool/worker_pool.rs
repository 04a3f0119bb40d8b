//! The shared, long-lived worker pool.
//!
//! A fixed number of worker tasks pull from one FIFO queue. Each call to
//! [`WorkerPool::submit_all`] enqueues a batch and suspends until every job
//! of that batch has reported into its pre-allocated result slot. Batches
//! from concurrent callers interleave on the same workers.

use super::batch::BatchCollector;
use super::error::PoolError;
use super::lifecycle::{drain_workers, DrainParams, LifecycleHandles, ShutdownOutcome};
use super::task::{
    result_channel, task_queue, QueuedGuard, QueuedTask, ResultSender, SubmitOptions,
    SubmitOutcome, TaskSender,
};
use super::worker::{Worker, WorkerActivityTracker};
use crate::job::guard::{execute_cancellable, panic_message, JobDecision};
use crate::job::{Job, JobInput, JobResult};
use crate::runtime::config::LoaderConfig;
use crate::runtime::telemetry::Telemetry;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WORKER_COUNT: usize = 5;

pub struct WorkerPoolParams {
    pub worker_count: usize,
    pub telemetry: Arc<Telemetry>,
    pub metrics_interval: Option<Duration>,
}

impl Default for WorkerPoolParams {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            telemetry: Arc::new(Telemetry::default()),
            metrics_interval: None,
        }
    }
}

pub struct WorkerPool {
    worker_count: usize,
    submitter: Mutex<Option<TaskSender>>,
    closed: AtomicBool,
    force_cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    workers_done: watch::Receiver<bool>,
    activity: Arc<WorkerActivityTracker>,
    telemetry: Arc<Telemetry>,
    next_batch: AtomicU64,
    lifecycle: Mutex<Option<LifecycleHandles>>,
}

impl WorkerPool {
    /// Starts a pool with `worker_count` workers (at least one).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Self::with_params(WorkerPoolParams {
            worker_count,
            ..WorkerPoolParams::default()
        })
    }

    /// Starts a pool sized by `config`, reporting into `telemetry`.
    pub fn from_config(config: &LoaderConfig, telemetry: Arc<Telemetry>) -> Result<Self, PoolError> {
        Self::with_params(WorkerPoolParams {
            worker_count: config.worker_count(),
            telemetry,
            metrics_interval: Some(config.metrics_interval()),
        })
    }

    pub fn with_params(params: WorkerPoolParams) -> Result<Self, PoolError> {
        let runtime = Handle::try_current().map_err(|_| PoolError::NoRuntime)?;
        let WorkerPoolParams {
            worker_count,
            telemetry,
            metrics_interval,
        } = params;
        let worker_count = worker_count.max(1);

        let (submitter, receiver) = task_queue();
        let queue = Arc::new(AsyncMutex::new(receiver));
        let force_cancel = CancellationToken::new();
        let activity = Arc::new(WorkerActivityTracker::new());
        let (workers_done_tx, workers_done_rx) = watch::channel(false);
        let remaining_workers = Arc::new(AtomicUsize::new(worker_count));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = Worker::new(
                worker_id,
                queue.clone(),
                force_cancel.clone(),
                activity.clone(),
            );
            let workers_done = workers_done_tx.clone();
            let remaining_workers = remaining_workers.clone();

            let handle = runtime.spawn(async move {
                if let Err(panic_payload) = AssertUnwindSafe(worker.run()).catch_unwind().await {
                    tracing::error!(
                        worker = worker_id,
                        panic = %panic_message(panic_payload.as_ref()),
                        "worker task panicked"
                    );
                }

                if remaining_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let _ = workers_done.send(true);
                }
            });
            workers.push(handle);
        }
        drop(workers_done_tx);

        telemetry.record_worker_pool_size(worker_count);
        let lifecycle = LifecycleHandles::spawn(
            &force_cancel,
            telemetry.clone(),
            activity.clone(),
            metrics_interval,
        );
        tracing::info!(workers = worker_count, "worker pool started");

        Ok(Self {
            worker_count,
            submitter: Mutex::new(Some(submitter)),
            closed: AtomicBool::new(false),
            force_cancel,
            workers: Mutex::new(workers),
            workers_done: workers_done_rx,
            activity,
            telemetry,
            next_batch: AtomicU64::new(0),
            lifecycle: Mutex::new(Some(lifecycle)),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of jobs currently executing on a worker.
    pub fn active_jobs(&self) -> usize {
        self.activity.active()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Runs every job and returns one result per job, in submission order.
    ///
    /// Job failures stay in their own slot and never abort siblings.
    pub async fn submit_all<J: Job>(
        &self,
        jobs: Vec<(JobInput, Arc<J>)>,
    ) -> Result<Vec<JobResult<J::Output>>, PoolError> {
        self.submit_all_with(jobs, SubmitOptions::default())
            .await
            .map(|outcome| outcome.results)
    }

    /// Like [`Self::submit_all`], with an explicit failure policy, deadline,
    /// and interrupt token.
    pub async fn submit_all_with<J: Job>(
        &self,
        jobs: Vec<(JobInput, Arc<J>)>,
        options: SubmitOptions,
    ) -> Result<SubmitOutcome<J::Output>, PoolError> {
        let submitter = self.submitter()?;
        if jobs.is_empty() {
            return Ok(SubmitOutcome {
                results: Vec::new(),
                abort: None,
            });
        }

        let batch = self.next_batch.fetch_add(1, Ordering::SeqCst);
        let total = jobs.len();
        let cancel = self.force_cancel.child_token();
        // Dropping the caller's future cancels whatever is still queued.
        let _cancel_on_drop = cancel.clone().drop_guard();
        let (results_tx, results_rx) = result_channel();

        tracing::debug!(batch, jobs = total, "dispatching batch");
        for (position, (input, job)) in jobs.into_iter().enumerate() {
            let run = self.job_future(job, input, position, cancel.clone(), results_tx.clone());
            let task = QueuedTask {
                batch,
                position,
                cancel: cancel.clone(),
                queued: QueuedGuard::enter(self.telemetry.clone()),
                run,
            };
            if submitter.send(task).is_err() {
                cancel.cancel();
                return Err(PoolError::PoolClosed);
            }
        }
        drop(results_tx);
        drop(submitter);

        let outcome = BatchCollector::new(batch, total, results_rx, cancel, self.telemetry.clone())
            .collect(&options)
            .await?;
        tracing::debug!(batch, jobs = total, "batch aggregated");
        Ok(outcome)
    }

    /// Stops accepting batches and waits up to `timeout` for queued and
    /// in-flight jobs to finish, force-cancelling them afterwards.
    ///
    /// Calling this more than once is a no-op that returns
    /// [`ShutdownOutcome::AlreadyClosed`].
    pub async fn shutdown(&self, timeout: Duration) -> Result<ShutdownOutcome, PoolError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("worker pool already closed");
            return Ok(ShutdownOutcome::AlreadyClosed);
        }

        tracing::info!(
            timeout_ms = timeout.as_millis() as u64,
            active_jobs = self.activity.active(),
            queued_jobs = self.telemetry.queued_jobs(),
            "shutting down worker pool"
        );
        drop(lock(&self.submitter).take());
        let handles = std::mem::take(&mut *lock(&self.workers));
        let lifecycle = lock(&self.lifecycle).take();

        let outcome = drain_workers(DrainParams {
            handles,
            workers_done: self.workers_done.clone(),
            force_cancel: &self.force_cancel,
            activity: &self.activity,
            telemetry: &self.telemetry,
            timeout,
        })
        .await;

        if let Some(lifecycle) = lifecycle {
            lifecycle.shutdown().await;
        }

        outcome
    }

    fn submitter(&self) -> Result<TaskSender, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }
        lock(&self.submitter)
            .as_ref()
            .cloned()
            .ok_or(PoolError::PoolClosed)
    }

    fn job_future<J: Job>(
        &self,
        job: Arc<J>,
        input: JobInput,
        position: usize,
        cancel: CancellationToken,
        results_tx: ResultSender<J::Output>,
    ) -> BoxFuture<'static, ()> {
        let telemetry = self.telemetry.clone();
        Box::pin(async move {
            let ordinal = input.ordinal();
            match execute_cancellable(job.as_ref(), input, &cancel).await {
                JobDecision::Finished(result) => {
                    telemetry.record_job_outcome(result.is_ok());
                    if let Err(err) = &result {
                        tracing::warn!(quiz = ordinal, position, error = %err, "job failed");
                    }
                    let _ = results_tx.send((position, result));
                }
                JobDecision::Cancelled => {
                    tracing::debug!(quiz = ordinal, position, "job cancelled");
                }
            }
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.force_cancel.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
