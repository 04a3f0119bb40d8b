use crate::batch::{BatchResult, BatchRunner};
use crate::job::{JobInput, QuizLoadJob, QuizRecord};
use crate::pool::{ShutdownOutcome, SubmitOptions, WorkerPool};
use crate::runtime::config::LoaderConfig;
use crate::runtime::telemetry::Telemetry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the worker pool for the lifetime of the application and loads quiz
/// batches through it, concurrently or as a sequential baseline.
pub struct QuizLoader {
    config: LoaderConfig,
    runner: BatchRunner<QuizLoadJob>,
    interrupt: CancellationToken,
    signal_listeners: CancellationToken,
    telemetry: Arc<Telemetry>,
}

impl QuizLoader {
    /// Starts the pool described by `config`. Must be called from within a
    /// Tokio runtime.
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate()?;

        let telemetry = Arc::new(Telemetry::default());
        let pool = WorkerPool::from_config(&config, telemetry.clone())
            .context("failed to start the quiz loader worker pool")?;
        let job = QuizLoadJob::new(config.latency())
            .with_fault_probability(config.fault_probability());

        let interrupt = CancellationToken::new();
        let mut options = SubmitOptions::default()
            .failure_policy(config.failure_policy())
            .interrupt(interrupt.clone());
        if let Some(limit) = config.batch_timeout() {
            options = options.deadline(limit);
        }

        let runner = BatchRunner::new(Arc::new(pool), Arc::new(job)).with_options(options);
        Ok(Self {
            config,
            runner,
            interrupt,
            signal_listeners: CancellationToken::new(),
            telemetry,
        })
    }

    /// Builds the loader from `QUIZLOADER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(LoaderConfig::from_env()?)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        self.runner.pool()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Token that interrupts any batch currently being awaited. Once
    /// cancelled, every later batch is interrupted as well.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Cancels the interrupt token on Ctrl-C (SIGINT). The task ends on the
    /// signal, when the token is cancelled elsewhere, or at [`Self::shutdown`].
    pub fn spawn_ctrl_c_interrupt(&self) -> JoinHandle<()> {
        let interrupt = self.interrupt.clone();
        let stop = self.signal_listeners.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => tracing::info!("Ctrl-C received; interrupting pending batches"),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to listen for Ctrl-C");
                            return;
                        }
                    }
                    interrupt.cancel();
                }
                _ = interrupt.cancelled() => {}
                _ = stop.cancelled() => {}
            }
        })
    }

    /// Loads `titles` through the worker pool.
    ///
    /// Fails with `InterruptedWait` once the interrupt token has been
    /// cancelled (for example by Ctrl-C), including for batches started later.
    pub async fn load_concurrent<S: AsRef<str>>(
        &self,
        titles: &[S],
    ) -> Result<BatchResult<QuizRecord>> {
        let inputs = Self::inputs(titles);
        self.runner
            .run_concurrent(&inputs)
            .await
            .context("concurrent quiz load failed")
    }

    /// Loads `titles` one at a time on the calling task. Works after
    /// [`Self::shutdown`], and is interrupted like [`Self::load_concurrent`].
    pub async fn load_sequential<S: AsRef<str>>(
        &self,
        titles: &[S],
    ) -> Result<BatchResult<QuizRecord>> {
        let inputs = Self::inputs(titles);
        self.runner
            .run_sequential(&inputs)
            .await
            .context("sequential quiz load failed")
    }

    /// Drains the pool within the configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<ShutdownOutcome> {
        let outcome = self.pool().shutdown(self.config.shutdown_timeout()).await;
        self.signal_listeners.cancel();
        outcome.context("quiz loader shutdown did not complete cleanly")
    }

    fn inputs<S: AsRef<str>>(titles: &[S]) -> Vec<JobInput> {
        JobInput::batch(titles.iter().map(|title| title.as_ref().to_owned()))
    }
}
