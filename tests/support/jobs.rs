use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use quizloader::{Job, JobError, JobFuture, JobInput, QuizRecord};
use tokio::time::sleep;

/// Quiz job with a per-index latency schedule and scripted failures.
pub struct ScriptedJob {
    latencies: Vec<Duration>,
    fallback: Duration,
    failing: HashSet<String>,
    invocations: Arc<AtomicUsize>,
}

impl ScriptedJob {
    pub fn with_latencies<I>(latencies_ms: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        Self {
            latencies: latencies_ms.into_iter().map(Duration::from_millis).collect(),
            fallback: Duration::from_millis(1_000),
            failing: HashSet::new(),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The last input finishes first.
    pub fn reversed(count: usize, step_ms: u64) -> Self {
        Self::with_latencies((0..count as u64).map(|index| (count as u64 - index) * step_ms))
    }

    pub fn failing_on(mut self, title: &str) -> Self {
        self.failing.insert(title.to_string());
        self
    }

    pub fn invocations(&self) -> Arc<AtomicUsize> {
        self.invocations.clone()
    }
}

impl Job for ScriptedJob {
    type Output = QuizRecord;

    fn execute(&self, input: JobInput) -> JobFuture<QuizRecord> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let latency = self
            .latencies
            .get(input.index())
            .copied()
            .unwrap_or(self.fallback);
        let fails = self.failing.contains(input.title());

        Box::pin(async move {
            sleep(latency).await;
            if fails {
                return Err(JobError::failed(anyhow!(
                    "source for {:?} is unreachable",
                    input.title()
                )));
            }
            Ok(QuizRecord::generate(input.title()))
        })
    }
}
