use std::fmt;
use std::time::Duration;

/// Pool-lifecycle faults surfaced to the caller of a batch or shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A batch was submitted after shutdown began.
    PoolClosed,
    /// Drain did not finish in time; remaining jobs were force-cancelled.
    ShutdownTimeout {
        timeout: Duration,
        cancelled_jobs: usize,
    },
    /// The wait for a batch was interrupted by an external signal.
    InterruptedWait { completed: usize, total: usize },
    /// The pool was constructed outside a Tokio runtime.
    NoRuntime,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::PoolClosed => write!(f, "worker pool is closed"),
            PoolError::ShutdownTimeout {
                timeout,
                cancelled_jobs,
            } => write!(
                f,
                "worker pool did not drain within {}ms; {cancelled_jobs} job(s) force-cancelled",
                timeout.as_millis()
            ),
            PoolError::InterruptedWait { completed, total } => write!(
                f,
                "batch wait interrupted after {completed} of {total} job(s) completed"
            ),
            PoolError::NoRuntime => write!(f, "worker pool requires a running Tokio runtime"),
        }
    }
}

impl std::error::Error for PoolError {}
