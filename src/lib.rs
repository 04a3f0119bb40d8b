pub mod batch;
pub mod job;
pub mod pool;
pub mod runtime;

pub use batch::{BatchResult, BatchRunner, BatchSummary, RunMode};
pub use job::{
    Difficulty, Job, JobError, JobErrorKind, JobFuture, JobInput, JobResult, LatencyModel,
    QuizAnswer, QuizLoadJob, QuizQuestion, QuizRecord,
};
pub use pool::{
    BatchAbort, FailurePolicy, PoolError, ShutdownOutcome, SubmitOptions, SubmitOutcome,
    WorkerPool,
};
pub use runtime::config::{LoaderConfig, LoaderConfigBuilder};
pub use runtime::loader::QuizLoader;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
