//! The quiz loading job: simulates a slow external source and synthesizes a
//! quiz record with a fixed shape.

use super::{Job, JobError, JobFuture, JobInput, LatencyModel};
use anyhow::anyhow;
use rand::Rng;
use serde::Serialize;
use std::io;
use tokio::time::Instant;

pub const QUESTIONS_PER_QUIZ: usize = 3;
pub const ANSWERS_PER_QUESTION: usize = 4;
/// 1-based position of the correct answer in every question.
pub const CORRECT_ANSWER_POSITION: usize = 1;

const EXTERNAL_DESCRIPTION: &str = "Loaded from external source";
const TIME_LIMIT_MINUTES: u32 = 30;
const POINTS_PER_QUESTION: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub text: String,
    pub points: u32,
    pub difficulty: Difficulty,
    pub answers: Vec<QuizAnswer>,
}

impl QuizQuestion {
    pub fn correct_answers(&self) -> impl Iterator<Item = &QuizAnswer> {
        self.answers.iter().filter(|answer| answer.correct)
    }
}

/// Payload produced by [`QuizLoadJob`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub title: String,
    pub description: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<QuizQuestion>,
}

impl QuizRecord {
    /// Synthesizes the record for `title`. The shape never varies.
    pub fn generate(title: &str) -> Self {
        let questions = (1..=QUESTIONS_PER_QUIZ)
            .map(|question| QuizQuestion {
                text: format!("Question {question} from {title}"),
                points: POINTS_PER_QUESTION,
                difficulty: Difficulty::Medium,
                answers: (1..=ANSWERS_PER_QUESTION)
                    .map(|answer| QuizAnswer {
                        text: format!("Answer {answer} for question {question}"),
                        correct: answer == CORRECT_ANSWER_POSITION,
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: title.to_owned(),
            description: EXTERNAL_DESCRIPTION.to_owned(),
            time_limit_minutes: TIME_LIMIT_MINUTES,
            questions,
        }
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|question| question.points).sum()
    }

    /// A record is usable when it has questions and every question has answers.
    pub fn is_valid(&self) -> bool {
        !self.questions.is_empty()
            && self
                .questions
                .iter()
                .all(|question| !question.answers.is_empty())
    }
}

/// Loads one quiz from the (simulated) external source.
#[derive(Debug, Clone, Default)]
pub struct QuizLoadJob {
    latency: LatencyModel,
    fault_probability: f64,
}

impl QuizLoadJob {
    pub fn new(latency: LatencyModel) -> Self {
        Self {
            latency,
            fault_probability: 0.0,
        }
    }

    /// Probability in `[0, 1]` that a load fails with a simulated I/O fault.
    pub fn with_fault_probability(mut self, probability: f64) -> Self {
        self.fault_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    pub fn latency(&self) -> LatencyModel {
        self.latency
    }
}

impl Job for QuizLoadJob {
    type Output = QuizRecord;

    fn execute(&self, input: JobInput) -> JobFuture<QuizRecord> {
        let (delay, inject_fault) = {
            let mut rng = rand::thread_rng();
            let delay = self.latency.sample_with(&mut rng);
            let inject_fault =
                self.fault_probability > 0.0 && rng.gen_bool(self.fault_probability);
            (delay, inject_fault)
        };

        Box::pin(async move {
            if input.title().trim().is_empty() {
                return Err(JobError::failed(anyhow!(
                    "quiz #{} has an empty title",
                    input.ordinal()
                )));
            }

            let started = Instant::now();
            tracing::info!(
                quiz = input.ordinal(),
                title = input.title(),
                "loading quiz"
            );

            tokio::time::sleep(delay).await;

            if inject_fault {
                tracing::warn!(
                    quiz = input.ordinal(),
                    title = input.title(),
                    "external source fault"
                );
                return Err(JobError::failed(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    format!("external source reset while loading {:?}", input.title()),
                )));
            }

            let record = QuizRecord::generate(input.title());
            tracing::info!(
                quiz = input.ordinal(),
                title = input.title(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "completed quiz"
            );
            Ok(record)
        })
    }
}
