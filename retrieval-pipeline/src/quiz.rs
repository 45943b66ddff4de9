use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            collection::{Collection, CollectionStatus},
            quiz_session::QuizSession,
        },
    },
    utils::{
        collection_name::prepare_collection_name,
        config::{AppConfig, EvaluationMode},
        embedding::EmbeddingProvider,
    },
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    chat_model::ChatModel,
    evaluation::{evaluate_with_cosine_similarity, evaluate_with_llm, Evaluation},
    quiz_generation::{generate_answer, generate_question},
    retriever::CollectionRetriever,
};

#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub top_k: usize,
    pub evaluation_mode: EvaluationMode,
    pub pass_threshold: f32,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            evaluation_mode: EvaluationMode::Cosine,
            pass_threshold: 0.8,
        }
    }
}

impl QuizSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            evaluation_mode: config.evaluation_mode,
            pass_threshold: config.evaluation_pass_threshold,
        }
    }
}

/// The evaluation of a user's answer followed by the next question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerTurn {
    pub evaluation: Evaluation,
    pub next_question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearOutcome {
    pub cleared: bool,
    pub collection_status: CollectionStatus,
}

/// Drives the quiz dialogue for one session at a time.
pub struct QuizEngine {
    db: Arc<SurrealDbClient>,
    embeddings: Arc<EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    settings: QuizSettings,
}

impl QuizEngine {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embeddings: Arc<EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        settings: QuizSettings,
    ) -> Self {
        Self {
            db,
            embeddings,
            chat,
            settings,
        }
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    fn retriever_for(&self, session: &QuizSession) -> Result<CollectionRetriever, AppError> {
        let collection = session
            .collection_name
            .as_deref()
            .ok_or_else(|| AppError::Validation("No collection selected".into()))?;
        Ok(CollectionRetriever::new(collection, self.settings.top_k))
    }

    async fn next_question_and_answer(
        &self,
        session: &QuizSession,
    ) -> Result<(String, String), AppError> {
        let retriever = self.retriever_for(session)?;

        let question = generate_question(
            self.chat.as_ref(),
            &self.db,
            &self.embeddings,
            &retriever,
            &session.previous_questions,
        )
        .await?;
        let answer = generate_answer(
            self.chat.as_ref(),
            &self.db,
            &self.embeddings,
            &retriever,
            &question,
        )
        .await?;

        Ok((question, answer))
    }

    /// Selects `filename` for the session and opens the dialogue with a first question.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn start(&self, session: &mut QuizSession, filename: &str) -> Result<String, AppError> {
        session.select_file(filename);

        let (question, answer) = self.next_question_and_answer(session).await?;
        session.record_question(question.clone(), answer);
        session.chat_history.clear();
        session.push_assistant_message(question.clone());

        info!(filename, "Chat started");
        Ok(question)
    }

    /// Scores the user's answer to the current question and asks the next one.
    #[instrument(skip(self, session, user_input), fields(session_id = %session.id))]
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        user_input: &str,
    ) -> Result<AnswerTurn, AppError> {
        if session.filename.is_none() {
            return Err(AppError::Validation(
                "No file selected. Click \"Chat\" to start the conversation.".into(),
            ));
        }
        let user_input = user_input.trim();
        if user_input.is_empty() {
            return Err(AppError::Validation("Answer must not be empty".into()));
        }
        let correct_answer = session
            .generated_answer
            .clone()
            .ok_or_else(|| AppError::Validation("No question has been asked yet".into()))?;

        session.push_user_message(user_input);

        let evaluation = match self.settings.evaluation_mode {
            EvaluationMode::Cosine => {
                evaluate_with_cosine_similarity(
                    &self.embeddings,
                    &correct_answer,
                    user_input,
                    self.settings.pass_threshold,
                )
                .await?
            }
            EvaluationMode::Llm => {
                let question = session.current_question.clone().unwrap_or_default();
                evaluate_with_llm(self.chat.as_ref(), &question, &correct_answer, user_input)
                    .await?
            }
        };

        let (next_question, next_answer) = self.next_question_and_answer(session).await?;
        session.record_question(next_question.clone(), next_answer);
        session.push_assistant_message(evaluation.message.clone());
        session.push_assistant_message(next_question.clone());

        info!(verdict = %evaluation.verdict, "Answer evaluated");
        Ok(AnswerTurn {
            evaluation,
            next_question,
        })
    }

    /// Clears the dialogue when `filename` is the session's file and reports its collection status.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn clear_chat(
        &self,
        session: &mut QuizSession,
        filename: &str,
    ) -> Result<ClearOutcome, AppError> {
        let cleared = session.is_current_file(filename);
        if cleared {
            session.clear_chat();
        }

        let collection = session
            .collection_name
            .clone()
            .filter(|_| cleared)
            .unwrap_or_else(|| prepare_collection_name(filename));
        let collection_status = Collection::check_exists(&collection, &self.db).await?;

        Ok(ClearOutcome {
            cleared,
            collection_status,
        })
    }
}
