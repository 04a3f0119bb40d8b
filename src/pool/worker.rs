use super::task::{QueuedTask, TaskReceiver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One long-lived execution slot pulling jobs from the shared FIFO queue.
pub(crate) struct Worker {
    pub(crate) id: usize,
    queue: Arc<Mutex<TaskReceiver>>,
    force_cancel: CancellationToken,
    activity: Arc<WorkerActivityTracker>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        queue: Arc<Mutex<TaskReceiver>>,
        force_cancel: CancellationToken,
        activity: Arc<WorkerActivityTracker>,
    ) -> Self {
        Self {
            id,
            queue,
            force_cancel,
            activity,
        }
    }

    /// Runs queued jobs until the queue is closed and drained, or until the
    /// pool is force-cancelled.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub(crate) async fn run(self) {
        tracing::debug!("worker task started");

        loop {
            let next = {
                let mut queue = self.queue.lock().await;
                tokio::select! {
                    biased;
                    _ = self.force_cancel.cancelled() => None,
                    task = queue.recv() => task,
                }
            };

            let Some(QueuedTask {
                batch,
                position,
                cancel,
                queued,
                run,
            }) = next
            else {
                break;
            };
            drop(queued);

            if cancel.is_cancelled() {
                tracing::debug!(batch, position, "skipping job of cancelled batch");
                continue;
            }

            let _activity = self.activity.enter();
            run.await;
        }

        if self.force_cancel.is_cancelled() {
            tracing::debug!("worker task force-cancelled");
        } else {
            tracing::debug!("worker task drained queue and exited");
        }
    }
}

/// Counts jobs currently executing on any worker.
#[derive(Debug, Default)]
pub struct WorkerActivityTracker {
    active_jobs: AtomicUsize,
}

impl WorkerActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(self: &Arc<Self>) -> WorkerActivityGuard {
        self.active_jobs.fetch_add(1, Ordering::SeqCst);
        WorkerActivityGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.active_jobs.load(Ordering::SeqCst)
    }
}

pub struct WorkerActivityGuard {
    tracker: Arc<WorkerActivityTracker>,
}

impl Drop for WorkerActivityGuard {
    fn drop(&mut self) {
        self.tracker.active_jobs.fetch_sub(1, Ordering::SeqCst);
    }
}
