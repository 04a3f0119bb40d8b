use anyhow::{anyhow, Error as AnyError};
use std::fmt;

/// Why a job did not produce a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    /// The job itself reported a fault (malformed input, I/O error).
    Failed,
    /// The job was cancelled before finishing (batch abort or forced shutdown).
    Cancelled,
    /// The batch deadline expired before the job finished.
    TimedOut,
    /// The job panicked while executing.
    Panicked,
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobErrorKind::Failed => "failed",
            JobErrorKind::Cancelled => "cancelled",
            JobErrorKind::TimedOut => "timed out",
            JobErrorKind::Panicked => "panicked",
        };
        f.write_str(label)
    }
}

/// Failure arm of a [`JobResult`](super::JobResult). Isolated to its own slot.
#[derive(Debug)]
pub struct JobError {
    kind: JobErrorKind,
    source: AnyError,
}

impl JobError {
    pub fn new(kind: JobErrorKind, source: AnyError) -> Self {
        Self { kind, source }
    }

    pub fn failed(source: impl Into<AnyError>) -> Self {
        Self::new(JobErrorKind::Failed, source.into())
    }

    pub fn cancelled(reason: impl fmt::Display) -> Self {
        Self::new(JobErrorKind::Cancelled, anyhow!("{reason}"))
    }

    pub fn timed_out(reason: impl fmt::Display) -> Self {
        Self::new(JobErrorKind::TimedOut, anyhow!("{reason}"))
    }

    pub fn panicked(message: impl fmt::Display) -> Self {
        Self::new(JobErrorKind::Panicked, anyhow!("{message}"))
    }

    pub fn kind(&self) -> JobErrorKind {
        self.kind
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind, JobErrorKind::Cancelled | JobErrorKind::TimedOut)
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {}: {}", self.kind, self.source)
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
