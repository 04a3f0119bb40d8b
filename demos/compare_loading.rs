//! Loads the default quiz titles concurrently and then sequentially and
//! prints how long each approach took.
//!
//! Configure with the `QUIZLOADER_*` environment variables and `RUST_LOG`.

use anyhow::Result;
use quizloader::{init_tracing, BatchResult, QuizLoader, QuizRecord};

const TITLES: [&str; 5] = [
    "Java Fundamentals",
    "Python Basics",
    "JavaScript Essentials",
    "Database Design",
    "Web Development",
];

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let loader = QuizLoader::from_env()?;
    let ctrl_c = loader.spawn_ctrl_c_interrupt();
    tracing::info!(workers = loader.config().worker_count(), "quiz loader ready");

    let outcome = compare(&loader).await;

    let shutdown = loader.shutdown().await;
    ctrl_c.abort();
    outcome?;
    shutdown?;
    Ok(())
}

async fn compare(loader: &QuizLoader) -> Result<()> {
    println!("=== Concurrent loading ({} workers) ===", loader.config().worker_count());
    let concurrent = loader.load_concurrent(&TITLES).await?;
    report(&concurrent);

    println!();
    println!("=== Sequential loading ===");
    let sequential = loader.load_sequential(&TITLES).await?;
    report(&sequential);

    println!();
    let concurrent_ms = concurrent.elapsed_millis();
    let sequential_ms = sequential.elapsed_millis();
    println!("Concurrent: {concurrent_ms}ms");
    println!("Sequential: {sequential_ms}ms");
    if concurrent_ms > 0 {
        println!(
            "Speedup:    {:.2}x",
            sequential_ms as f64 / concurrent_ms as f64
        );
    }
    Ok(())
}

fn report(batch: &BatchResult<QuizRecord>) {
    for (ordinal, result) in batch.results.iter().enumerate().map(|(i, r)| (i + 1, r)) {
        match result {
            Ok(quiz) => println!(
                "  #{ordinal} {} ({} questions, {} points)",
                quiz.title,
                quiz.questions.len(),
                quiz.total_points()
            ),
            Err(err) => println!("  #{ordinal} failed: {err}"),
        }
    }
    if let Some(abort) = &batch.abort {
        println!("  aborted at #{}: {}", abort.index + 1, abort.error);
    }
    println!("  {}", batch.summary());
}
