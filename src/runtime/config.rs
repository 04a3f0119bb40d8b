use crate::job::latency::{DEFAULT_LATENCY_MAX, DEFAULT_LATENCY_MIN};
use crate::job::LatencyModel;
use crate::pool::{FailurePolicy, DEFAULT_WORKER_COUNT};
use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60;

pub const ENV_WORKERS: &str = "QUIZLOADER_WORKERS";
pub const ENV_LATENCY_MIN_MS: &str = "QUIZLOADER_LATENCY_MIN_MS";
pub const ENV_LATENCY_MAX_MS: &str = "QUIZLOADER_LATENCY_MAX_MS";
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "QUIZLOADER_SHUTDOWN_TIMEOUT_SECS";
pub const ENV_BATCH_TIMEOUT_MS: &str = "QUIZLOADER_BATCH_TIMEOUT_MS";
pub const ENV_FAIL_FAST: &str = "QUIZLOADER_FAIL_FAST";
pub const ENV_FAULT_PROBABILITY: &str = "QUIZLOADER_FAULT_PROBABILITY";
pub const ENV_METRICS_INTERVAL_SECS: &str = "QUIZLOADER_METRICS_INTERVAL_SECS";

/// Runtime configuration for the loader and its worker pool.
///
/// Instances are constructed via [`LoaderConfig::builder`] or
/// [`LoaderConfig::from_env`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    worker_count: usize,
    latency: LatencyModel,
    shutdown_timeout: Duration,
    batch_timeout: Option<Duration>,
    failure_policy: FailurePolicy,
    fault_probability: f64,
    metrics_interval: Duration,
}

impl LoaderConfig {
    /// Returns a builder with every value defaulted.
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::default()
    }

    /// Builds a configuration from `QUIZLOADER_*` environment variables,
    /// falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(workers) = parse_var::<usize, _>(&lookup, ENV_WORKERS)? {
            builder = builder.worker_count(workers);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_LATENCY_MIN_MS)? {
            builder = builder.latency_min(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_LATENCY_MAX_MS)? {
            builder = builder.latency_max(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SHUTDOWN_TIMEOUT_SECS)? {
            builder = builder.shutdown_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_BATCH_TIMEOUT_MS)? {
            builder = builder.batch_timeout(Duration::from_millis(ms));
        }
        if let Some(fail_fast) = lookup(ENV_FAIL_FAST) {
            let fail_fast =
                parse_flag(&fail_fast).with_context(|| format!("invalid {ENV_FAIL_FAST}"))?;
            let policy = if fail_fast {
                FailurePolicy::AbortOnFirst
            } else {
                FailurePolicy::Isolate
            };
            builder = builder.failure_policy(policy);
        }
        if let Some(probability) = parse_var::<f64, _>(&lookup, ENV_FAULT_PROBABILITY)? {
            builder = builder.fault_probability(probability);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_METRICS_INTERVAL_SECS)? {
            builder = builder.metrics_interval(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Simulated latency bounds for each quiz load.
    pub fn latency(&self) -> LatencyModel {
        self.latency
    }

    /// Drain deadline used by [`QuizLoader::shutdown`](super::loader::QuizLoader::shutdown).
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Optional per-batch deadline.
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Probability that a simulated load fails with an I/O fault.
    pub fn fault_probability(&self) -> f64 {
        self.fault_probability
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        if self.shutdown_timeout.is_zero() {
            bail!("shutdown_timeout must be greater than 0");
        }

        if matches!(self.batch_timeout, Some(timeout) if timeout.is_zero()) {
            bail!("batch_timeout must be greater than 0 when set");
        }

        if !(0.0..=1.0).contains(&self.fault_probability) {
            bail!("fault_probability must be within 0.0..=1.0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            latency: LatencyModel::default(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            batch_timeout: None,
            failure_policy: FailurePolicy::Isolate,
            fault_probability: 0.0,
            metrics_interval: telemetry::DEFAULT_METRICS_INTERVAL,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LoaderConfigBuilder {
    worker_count: Option<usize>,
    latency_min: Option<Duration>,
    latency_max: Option<Duration>,
    shutdown_timeout: Option<Duration>,
    batch_timeout: Option<Duration>,
    failure_policy: Option<FailurePolicy>,
    fault_probability: Option<f64>,
    metrics_interval: Option<Duration>,
}

impl LoaderConfigBuilder {
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn latency_min(mut self, latency: Duration) -> Self {
        self.latency_min = Some(latency);
        self
    }

    pub fn latency_max(mut self, latency: Duration) -> Self {
        self.latency_max = Some(latency);
        self
    }

    pub fn latency(self, min: Duration, max: Duration) -> Self {
        self.latency_min(min).latency_max(max)
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn fault_probability(mut self, probability: f64) -> Self {
        self.fault_probability = Some(probability);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<LoaderConfig> {
        let latency_min = self.latency_min.unwrap_or(DEFAULT_LATENCY_MIN);
        let latency_max = self.latency_max.unwrap_or(DEFAULT_LATENCY_MAX);
        if latency_max < latency_min {
            bail!(
                "latency_max ({}ms) must not be below latency_min ({}ms)",
                latency_max.as_millis(),
                latency_min.as_millis()
            );
        }

        let defaults = LoaderConfig::default();
        let config = LoaderConfig {
            worker_count: self.worker_count.unwrap_or(defaults.worker_count),
            latency: LatencyModel::new(latency_min, latency_max)?,
            shutdown_timeout: self.shutdown_timeout.unwrap_or(defaults.shutdown_timeout),
            batch_timeout: self.batch_timeout.or(defaults.batch_timeout),
            failure_policy: self.failure_policy.unwrap_or(defaults.failure_policy),
            fault_probability: self.fault_probability.unwrap_or(defaults.fault_probability),
            metrics_interval: self.metrics_interval.unwrap_or(defaults.metrics_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid {key} value {raw:?}"))
        })
        .transpose()
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean flag, got {other:?}"),
    }
}
