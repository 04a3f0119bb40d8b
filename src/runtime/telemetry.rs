use crate::batch::RunMode;
use crate::pool::WorkerActivityTracker;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters for jobs and batches.
#[derive(Default, Debug)]
pub struct Telemetry {
    jobs_submitted: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_cancelled: AtomicU64,
    concurrent_batches: AtomicU64,
    sequential_batches: AtomicU64,
    worker_pool_size: AtomicUsize,
    queued_jobs: AtomicUsize,
}

impl Telemetry {
    pub fn record_submitted(&self, count: usize) {
        self.jobs_submitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// A job entered the pool queue.
    pub fn record_enqueued(&self) {
        self.record_submitted(1);
        self.queued_jobs.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker took a job off the pool queue.
    pub fn record_dequeued(&self) {
        let _ = self
            .queued_jobs
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |queued| {
                Some(queued.saturating_sub(1))
            });
    }

    pub fn record_job_outcome(&self, succeeded: bool) {
        if succeeded {
            self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cancelled(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.jobs_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_batch(&self, mode: RunMode) {
        let counter = match mode {
            RunMode::Concurrent => &self.concurrent_batches,
            RunMode::Sequential => &self.sequential_batches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_pool_size(&self, workers: usize) {
        self.worker_pool_size.store(workers, Ordering::Relaxed);
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size.load(Ordering::Relaxed)
    }

    pub fn queued_jobs(&self) -> usize {
        self.queued_jobs.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
            concurrent_batches: self.concurrent_batches.load(Ordering::Relaxed),
            sequential_batches: self.sequential_batches.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub jobs_submitted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub concurrent_batches: u64,
    pub sequential_batches: u64,
}

impl TelemetrySnapshot {
    pub fn jobs_finished(&self) -> u64 {
        self.jobs_succeeded + self.jobs_failed
    }
}

/// Spawns a background task that periodically logs throughput, queue depth, and failures.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    activity: Arc<WorkerActivityTracker>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "quizloader::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let finished_delta = current_snapshot
                        .jobs_finished()
                        .saturating_sub(last_snapshot.jobs_finished());
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        finished_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "quizloader::metrics",
                        throughput = format!("{throughput:.2}"),
                        workers = telemetry.worker_pool_size(),
                        active_jobs = activity.active(),
                        queued_jobs = telemetry.queued_jobs(),
                        succeeded = current_snapshot.jobs_succeeded,
                        failed = current_snapshot.jobs_failed,
                        cancelled = current_snapshot.jobs_cancelled,
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
