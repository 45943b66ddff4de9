use std::fmt;

use common::{
    error::AppError,
    utils::{
        embedding::{cosine_similarity, EmbeddingProvider},
        prompts::{evaluation_user_message, ANSWER_EVALUATION_SYSTEM_PROMPT},
    },
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::chat_model::ChatModel;

/// Lower bound for partial credit when scoring by similarity.
pub const PARTIAL_CREDIT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Correct,
    #[serde(rename = "Partially correct")]
    PartiallyCorrect,
    Incorrect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "Correct"),
            Verdict::PartiallyCorrect => write!(f, "Partially correct"),
            Verdict::Incorrect => write!(f, "Incorrect"),
        }
    }
}

impl Verdict {
    pub fn from_score(score: f32, pass_threshold: f32) -> Self {
        if score >= pass_threshold {
            Verdict::Correct
        } else if score >= PARTIAL_CREDIT_THRESHOLD.min(pass_threshold) {
            Verdict::PartiallyCorrect
        } else {
            Verdict::Incorrect
        }
    }

    fn parse(label: &str) -> Option<Self> {
        match label.trim().trim_end_matches('.').to_lowercase().as_str() {
            "correct" => Some(Verdict::Correct),
            "partially correct" | "partially_correct" | "partial" => Some(Verdict::PartiallyCorrect),
            "incorrect" => Some(Verdict::Incorrect),
            _ => None,
        }
    }
}

/// Outcome of scoring one user answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Cosine similarity to the reference answer; absent for model-judged answers.
    pub score: Option<f32>,
    pub verdict: Verdict,
    pub reference_answer: String,
    /// Chat message shown to the user.
    pub message: String,
}

/// Scores the user's answer by embedding both texts and comparing them.
#[instrument(skip_all, fields(pass_threshold = pass_threshold))]
pub async fn evaluate_with_cosine_similarity(
    embeddings: &EmbeddingProvider,
    correct_answer: &str,
    user_answer: &str,
    pass_threshold: f32,
) -> Result<Evaluation, AppError> {
    let score = if user_answer.trim().is_empty() {
        0.0
    } else {
        let vectors = embeddings
            .embed_batch(vec![correct_answer.to_string(), user_answer.to_string()])
            .await?;
        match vectors.as_slice() {
            [correct, user] => cosine_similarity(correct, user),
            _ => {
                return Err(AppError::InternalError(format!(
                    "expected 2 embeddings, received {}",
                    vectors.len()
                )))
            }
        }
    };

    let verdict = Verdict::from_score(score, pass_threshold);
    debug!(score, %verdict, "Answer scored by similarity");

    let message = format!(
        "{verdict}. Your answer has a similarity score of {score:.2} to the expected answer.\n\nCorrect answer: {correct_answer}"
    );

    Ok(Evaluation {
        score: Some(score),
        verdict,
        reference_answer: correct_answer.to_string(),
        message,
    })
}

/// Lets the chat model judge the user's answer against the reference answer.
#[instrument(skip_all)]
pub async fn evaluate_with_llm(
    chat: &dyn ChatModel,
    question: &str,
    correct_answer: &str,
    user_answer: &str,
) -> Result<Evaluation, AppError> {
    let user_message = evaluation_user_message(question, correct_answer, user_answer);
    let reply = chat
        .complete(ANSWER_EVALUATION_SYSTEM_PROMPT, &user_message)
        .await?;

    let (verdict, feedback) = parse_judgement(&reply)?;
    debug!(%verdict, "Answer judged by model");

    let message = if feedback.is_empty() {
        format!("{verdict}.\n\nCorrect answer: {correct_answer}")
    } else {
        format!("{verdict}. {feedback}\n\nCorrect answer: {correct_answer}")
    };

    Ok(Evaluation {
        score: None,
        verdict,
        reference_answer: correct_answer.to_string(),
        message,
    })
}

fn parse_judgement(reply: &str) -> Result<(Verdict, String), AppError> {
    let mut verdict = None;
    let mut feedback = String::new();

    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = strip_label(line, "verdict:") {
            verdict = Verdict::parse(rest);
        } else if let Some(rest) = strip_label(line, "feedback:") {
            feedback = rest.trim().to_string();
        }
    }

    verdict
        .map(|verdict| (verdict, feedback))
        .ok_or_else(|| AppError::LLMParsing(format!("No verdict found in evaluation: {reply}")))
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let prefix = line.get(..label.len())?;
    if prefix.eq_ignore_ascii_case(label) {
        line.get(label.len()..)
    } else {
        None
    }
}
