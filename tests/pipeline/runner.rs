use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::support::{
    helpers::{assert_quiz_shape, init_tracing, runner_with, shutdown, DEFAULT_TITLES},
    jobs::ScriptedJob,
};
use quizloader::{
    FailurePolicy, JobErrorKind, JobInput, LatencyModel, QuizLoadJob, RunMode, SubmitOptions,
};

#[tokio::test(start_paused = true)]
async fn both_modes_return_one_result_per_input() {
    init_tracing();
    let runner = runner_with(5, QuizLoadJob::default());

    for size in [1usize, 3, 5, 8] {
        let inputs = JobInput::batch(DEFAULT_TITLES.iter().cycle().take(size).copied());
        let concurrent = runner.run_concurrent(&inputs).await.expect("concurrent");
        let sequential = runner.run_sequential(&inputs).await.expect("sequential");

        assert_eq!(concurrent.len(), size);
        assert_eq!(sequential.len(), size);
        assert_eq!(concurrent.mode, RunMode::Concurrent);
        assert_eq!(sequential.mode, RunMode::Sequential);
    }

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_results_keep_input_order_when_completion_is_reversed() {
    init_tracing();
    let runner = runner_with(5, ScriptedJob::reversed(5, 200));
    let inputs = JobInput::batch(DEFAULT_TITLES);

    let batch = runner.run_concurrent(&inputs).await.expect("batch");

    let loaded: Vec<&str> = batch.payloads().map(|quiz| quiz.title.as_str()).collect();
    assert_eq!(loaded, DEFAULT_TITLES);
    // Slowest job is the first one: 5 * 200ms.
    assert!(batch.elapsed >= Duration::from_millis(1_000));
    assert!(batch.elapsed < Duration::from_millis(1_100));

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_beats_sequential_with_default_latency() {
    init_tracing();
    let runner = runner_with(5, QuizLoadJob::new(LatencyModel::default()));
    let inputs = JobInput::batch(DEFAULT_TITLES);

    let concurrent = runner.run_concurrent(&inputs).await.expect("concurrent");
    let sequential = runner.run_sequential(&inputs).await.expect("sequential");

    assert!(concurrent.elapsed < Duration::from_millis(3_100));
    assert!(sequential.elapsed >= Duration::from_millis(5_000));
    assert!(concurrent.elapsed < sequential.elapsed);

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn every_payload_has_the_fixed_shape() {
    init_tracing();
    let runner = runner_with(3, QuizLoadJob::default());
    let inputs = JobInput::batch(DEFAULT_TITLES);

    let concurrent = runner.run_concurrent(&inputs).await.expect("concurrent");
    let sequential = runner.run_sequential(&inputs).await.expect("sequential");

    for quiz in concurrent.payloads().chain(sequential.payloads()) {
        assert_quiz_shape(quiz);
    }
    assert_eq!(concurrent.succeeded(), 5);
    assert_eq!(sequential.succeeded(), 5);

    shutdown(&runner).await;
}

#[tokio::test]
async fn empty_batch_invokes_no_job() {
    init_tracing();
    let job = ScriptedJob::with_latencies([]);
    let invocations = job.invocations();
    let runner = runner_with(2, job);

    let concurrent = runner.run_concurrent(&[]).await.expect("concurrent");
    let sequential = runner.run_sequential(&[]).await.expect("sequential");

    assert!(concurrent.is_empty());
    assert!(sequential.is_empty());
    assert_eq!(concurrent.elapsed, Duration::ZERO);
    assert_eq!(sequential.elapsed, Duration::ZERO);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert_eq!(runner.pool().active_jobs(), 0);

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn single_job_batches_match_across_modes() {
    init_tracing();
    let runner = runner_with(5, QuizLoadJob::default());
    let inputs = JobInput::batch(["Rust Ownership"]);

    let concurrent = runner.run_concurrent(&inputs).await.expect("concurrent");
    let sequential = runner.run_sequential(&inputs).await.expect("sequential");

    let from_pool = concurrent.results[0].as_ref().expect("concurrent payload");
    let in_caller = sequential.results[0].as_ref().expect("sequential payload");
    assert_eq!(from_pool, in_caller);
    assert_eq!(from_pool.questions.len(), in_caller.questions.len());

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn failed_job_is_isolated_in_both_modes() {
    init_tracing();
    let runner = runner_with(5, ScriptedJob::reversed(5, 100).failing_on("Database Design"));
    let inputs = JobInput::batch(DEFAULT_TITLES);

    for batch in [
        runner.run_concurrent(&inputs).await.expect("concurrent"),
        runner.run_sequential(&inputs).await.expect("sequential"),
    ] {
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.succeeded(), 4);
        let err = batch.results[3].as_ref().expect_err("fourth input fails");
        assert_eq!(err.kind(), JobErrorKind::Failed);
        assert!(err.to_string().contains("Database Design"));
    }

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn abort_on_first_failure_carries_the_failure_separately() {
    init_tracing();
    let job = ScriptedJob::with_latencies([100; 5]).failing_on("Python Basics");
    let runner = runner_with(1, job)
        .with_options(SubmitOptions::default().failure_policy(FailurePolicy::AbortOnFirst));
    let inputs = JobInput::batch(DEFAULT_TITLES);

    for batch in [
        runner.run_concurrent(&inputs).await.expect("concurrent"),
        runner.run_sequential(&inputs).await.expect("sequential"),
    ] {
        assert_eq!(batch.len(), 1);
        let abort = batch.abort.as_ref().expect("aborted");
        assert_eq!(abort.index, 1);
        assert_eq!(abort.error.kind(), JobErrorKind::Failed);
        assert_eq!(batch.summary().failed, 1);
    }

    shutdown(&runner).await;
}

#[tokio::test(start_paused = true)]
async fn batch_timeout_reports_unfinished_jobs() {
    init_tracing();
    let runner = runner_with(5, ScriptedJob::with_latencies([100, 5_000, 100]))
        .with_options(SubmitOptions::default().deadline(Duration::from_secs(1)));
    let inputs = JobInput::batch(["quick", "stuck", "also quick"]);

    let batch = runner.run_concurrent(&inputs).await.expect("batch returns");

    assert_eq!(batch.len(), 3);
    assert!(batch.results[0].is_ok());
    assert_eq!(
        batch.results[1].as_ref().expect_err("timed out").kind(),
        JobErrorKind::TimedOut
    );
    assert!(batch.results[2].is_ok());
    assert!(batch.elapsed >= Duration::from_secs(1));
    assert!(batch.elapsed < Duration::from_millis(1_100));

    shutdown(&runner).await;
}
