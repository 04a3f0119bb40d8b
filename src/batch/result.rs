use crate::job::JobResult;
use crate::pool::BatchAbort;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Which path executed a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Concurrent,
    Sequential,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Concurrent => "concurrent",
            RunMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered results of one batch invocation plus its timing.
///
/// `results[i]` always belongs to `inputs[i]`. When the batch was aborted on
/// its first failure, `results` stops before the failing input and the
/// failure is held in `abort`.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub mode: RunMode,
    pub elapsed: Duration,
    pub results: Vec<JobResult<T>>,
    pub abort: Option<BatchAbort>,
}

impl<T> BatchResult<T> {
    pub(crate) fn empty(mode: RunMode) -> Self {
        Self {
            mode,
            elapsed: Duration::ZERO,
            results: Vec::new(),
            abort: None,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|result| result.is_ok()).count()
    }

    /// Failed slots, counting the aborting failure if there was one.
    pub fn failed(&self) -> usize {
        let in_slots = self.results.iter().filter(|result| result.is_err()).count();
        in_slots + usize::from(self.abort.is_some())
    }

    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Successful payloads in input order.
    pub fn payloads(&self) -> impl Iterator<Item = &T> {
        self.results.iter().filter_map(|result| result.as_ref().ok())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            mode: self.mode,
            elapsed_millis: self.elapsed_millis(),
            total: self.len() + usize::from(self.abort.is_some()),
            succeeded: self.succeeded(),
            failed: self.failed(),
        }
    }
}

/// Serializable view of a [`BatchResult`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub mode: RunMode,
    pub elapsed_millis: u64,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch: {}/{} succeeded in {}ms",
            self.mode, self.succeeded, self.total, self.elapsed_millis
        )
    }
}
