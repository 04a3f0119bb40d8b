use crate::job::{JobError, JobResult};
use crate::runtime::telemetry::Telemetry;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a batch reacts to a failed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Every job runs to completion; failures stay in their own slot.
    #[default]
    Isolate,
    /// The first failure cancels the remaining jobs of the batch.
    AbortOnFirst,
}

/// Per-batch knobs for [`WorkerPool::submit_all_with`](super::WorkerPool::submit_all_with).
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub failure_policy: FailurePolicy,
    pub deadline: Option<Duration>,
    pub interrupt: Option<CancellationToken>,
}

impl SubmitOptions {
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = Some(token);
        self
    }
}

/// The failure that stopped an [`FailurePolicy::AbortOnFirst`] batch.
#[derive(Debug)]
pub struct BatchAbort {
    pub index: usize,
    pub error: JobError,
}

/// Ordered results of a batch.
///
/// With [`FailurePolicy::Isolate`] `results` has one entry per submitted job.
/// When a batch was aborted, `results` only covers the jobs preceding the
/// failing one and the failure itself is carried in `abort`.
#[derive(Debug)]
pub struct SubmitOutcome<T> {
    pub results: Vec<JobResult<T>>,
    pub abort: Option<BatchAbort>,
}

/// A job waiting in the shared FIFO queue.
pub(crate) struct QueuedTask {
    pub(crate) batch: u64,
    pub(crate) position: usize,
    pub(crate) cancel: CancellationToken,
    // Dropped before `run`, which holds the batch's result sender.
    pub(crate) queued: QueuedGuard,
    pub(crate) run: BoxFuture<'static, ()>,
}

/// Counts a task in the queued-jobs gauge until it leaves the queue, either
/// taken by a worker or dropped with the queue.
pub(crate) struct QueuedGuard {
    telemetry: Arc<Telemetry>,
}

impl QueuedGuard {
    pub(crate) fn enter(telemetry: Arc<Telemetry>) -> Self {
        telemetry.record_enqueued();
        Self { telemetry }
    }
}

impl Drop for QueuedGuard {
    fn drop(&mut self) {
        self.telemetry.record_dequeued();
    }
}

pub(crate) type TaskSender = mpsc::UnboundedSender<QueuedTask>;
pub(crate) type TaskReceiver = mpsc::UnboundedReceiver<QueuedTask>;

pub(crate) type ResultSender<T> = mpsc::UnboundedSender<(usize, JobResult<T>)>;
pub(crate) type ResultReceiver<T> = mpsc::UnboundedReceiver<(usize, JobResult<T>)>;

pub(crate) fn task_queue() -> (TaskSender, TaskReceiver) {
    mpsc::unbounded_channel()
}

pub(crate) fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    mpsc::unbounded_channel()
}
