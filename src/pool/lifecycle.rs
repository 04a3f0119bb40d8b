//! Pool lifecycle: background reporter ownership and the drain / force-cancel
//! sequence run at shutdown.

use super::error::PoolError;
use super::worker::WorkerActivityTracker;
use crate::runtime::telemetry::{self, Telemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long workers get to observe a force-cancel before they are aborted.
const FORCE_CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Result of a successful [`WorkerPool::shutdown`](super::WorkerPool::shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All queued and in-flight jobs finished before the deadline.
    Drained,
    /// The pool had already been shut down; nothing was done.
    AlreadyClosed,
}

pub(crate) struct LifecycleHandles {
    reporter_shutdown: CancellationToken,
    metrics_handle: Option<JoinHandle<()>>,
}

impl LifecycleHandles {
    /// Reporters stop with `parent`, or earlier through [`Self::shutdown`].
    pub(crate) fn spawn(
        parent: &CancellationToken,
        telemetry: Arc<Telemetry>,
        activity: Arc<WorkerActivityTracker>,
        metrics_interval: Option<Duration>,
    ) -> Self {
        let reporter_shutdown = parent.child_token();
        let metrics_handle = metrics_interval.map(|interval| {
            telemetry::spawn_metrics_reporter(
                telemetry,
                activity,
                reporter_shutdown.clone(),
                interval,
            )
        });

        Self {
            reporter_shutdown,
            metrics_handle,
        }
    }

    pub(crate) async fn shutdown(mut self) {
        self.reporter_shutdown.cancel();
        if let Some(handle) = self.metrics_handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "metrics reporter task panicked");
            }
        }
    }
}

pub(crate) struct DrainParams<'a> {
    pub handles: Vec<JoinHandle<()>>,
    pub workers_done: watch::Receiver<bool>,
    pub force_cancel: &'a CancellationToken,
    pub activity: &'a WorkerActivityTracker,
    pub telemetry: &'a Telemetry,
    pub timeout: Duration,
}

/// Waits for the workers to drain the (already closed) queue. When `timeout`
/// elapses first, every remaining job is cancelled and stragglers are aborted.
pub(crate) async fn drain_workers(params: DrainParams<'_>) -> Result<ShutdownOutcome, PoolError> {
    let DrainParams {
        handles,
        mut workers_done,
        force_cancel,
        activity,
        telemetry,
        timeout,
    } = params;

    if wait_for_workers(&mut workers_done, timeout).await {
        tracing::info!("worker pool drained");
        return Ok(ShutdownOutcome::Drained);
    }

    let cancelled_jobs = activity.active().saturating_add(telemetry.queued_jobs());
    tracing::warn!(
        timeout_ms = timeout.as_millis() as u64,
        cancelled_jobs,
        "worker pool drain deadline elapsed; force-cancelling remaining jobs"
    );
    force_cancel.cancel();

    if !wait_for_workers(&mut workers_done, FORCE_CANCEL_GRACE).await {
        for (worker_id, handle) in handles.iter().enumerate() {
            if !handle.is_finished() {
                tracing::warn!(worker = worker_id, "aborting unresponsive worker");
                handle.abort();
            }
        }
    }

    Err(PoolError::ShutdownTimeout {
        timeout,
        cancelled_jobs,
    })
}

async fn wait_for_workers(workers_done: &mut watch::Receiver<bool>, limit: Duration) -> bool {
    // A closed channel means every worker task is gone.
    tokio::time::timeout(limit, workers_done.wait_for(|done| *done))
        .await
        .is_ok()
}
