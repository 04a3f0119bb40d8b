use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use quizloader::{BatchRunner, Job, QuizRecord, WorkerPool};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_TITLES: [&str; 5] = [
    "Java Fundamentals",
    "Python Basics",
    "JavaScript Essentials",
    "Database Design",
    "Web Development",
];

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn runner_with<J: Job>(workers: usize, job: J) -> BatchRunner<J> {
    let pool = WorkerPool::new(workers).expect("pool starts inside the test runtime");
    BatchRunner::new(Arc::new(pool), Arc::new(job))
}

pub async fn shutdown<J: Job>(runner: &BatchRunner<J>) {
    runner
        .pool()
        .shutdown(Duration::from_secs(5))
        .await
        .expect("pool drains");
}

/// Asserts the fixed payload shape: 3 questions of 4 answers, first answer correct.
pub fn assert_quiz_shape(quiz: &QuizRecord) {
    assert_eq!(quiz.questions.len(), 3, "quiz {:?}", quiz.title);
    for question in &quiz.questions {
        assert_eq!(question.answers.len(), 4, "question {:?}", question.text);
        let correct: Vec<usize> = question
            .answers
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.correct)
            .map(|(position, _)| position)
            .collect();
        assert_eq!(correct, vec![0], "question {:?}", question.text);
    }
    assert!(quiz.is_valid());
}
