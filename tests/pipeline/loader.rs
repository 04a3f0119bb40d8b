use std::time::Duration;

use crate::support::helpers::{assert_quiz_shape, init_tracing, DEFAULT_TITLES};
use quizloader::{LoaderConfig, PoolError, QuizLoader, ShutdownOutcome};

fn loader() -> QuizLoader {
    let config = LoaderConfig::builder()
        .worker_count(5)
        .shutdown_timeout(Duration::from_secs(10))
        .build()
        .expect("valid config");
    QuizLoader::new(config).expect("loader starts")
}

#[tokio::test(start_paused = true)]
async fn loads_default_titles_and_reports_summaries() {
    init_tracing();
    let loader = loader();

    let concurrent = loader.load_concurrent(&DEFAULT_TITLES).await.expect("concurrent");
    let sequential = loader.load_sequential(&DEFAULT_TITLES).await.expect("sequential");

    for quiz in concurrent.payloads() {
        assert_quiz_shape(quiz);
        assert_eq!(quiz.description, "Loaded from external source");
        assert_eq!(quiz.time_limit_minutes, 30);
    }

    let summary = serde_json::to_value(concurrent.summary()).expect("serializable");
    assert_eq!(summary["mode"], "concurrent");
    assert_eq!(summary["total"], 5);
    assert_eq!(summary["succeeded"], 5);
    assert_eq!(summary["failed"], 0);
    assert!(summary["elapsedMillis"].as_u64().expect("millis") < 3_100);

    let summary = serde_json::to_value(sequential.summary()).expect("serializable");
    assert_eq!(summary["mode"], "sequential");
    assert!(summary["elapsedMillis"].as_u64().expect("millis") >= 5_000);

    let snapshot = loader.telemetry().snapshot();
    assert_eq!(snapshot.jobs_succeeded, 10);
    assert_eq!(snapshot.concurrent_batches, 1);
    assert_eq!(snapshot.sequential_batches, 1);

    loader.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn second_shutdown_is_a_no_op_and_submission_fails_fast() {
    init_tracing();
    let loader = loader();

    assert_eq!(loader.shutdown().await.expect("first"), ShutdownOutcome::Drained);
    assert_eq!(
        loader.shutdown().await.expect("second"),
        ShutdownOutcome::AlreadyClosed
    );

    let err = loader
        .load_concurrent(&DEFAULT_TITLES)
        .await
        .expect_err("pool is closed");
    assert_eq!(err.downcast_ref::<PoolError>(), Some(&PoolError::PoolClosed));
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_work_in_flight_waits_for_it() {
    init_tracing();
    let loader = std::sync::Arc::new(loader());

    let loading = {
        let loader = loader.clone();
        tokio::spawn(async move { loader.load_concurrent(&DEFAULT_TITLES).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(loader.shutdown().await.expect("drained"), ShutdownOutcome::Drained);
    let batch = loading.await.expect("join").expect("batch finished");
    assert_eq!(batch.succeeded(), 5);
}
