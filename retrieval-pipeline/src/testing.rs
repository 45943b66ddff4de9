//! In-memory doubles shared by this crate's tests and the router tests.

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{collection::Collection, text_chunk::TextChunk},
    },
    utils::{
        embedding::EmbeddingProvider,
        prompts::{
            ANSWER_EVALUATION_SYSTEM_PROMPT, ANSWER_GENERATION_SYSTEM_PROMPT,
            QUESTION_GENERATION_SYSTEM_PROMPT,
        },
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::chat_model::ChatModel;

/// Chat model that answers each prompt kind with numbered canned text.
pub struct ScriptedChatModel {
    evaluation_reply: String,
    state: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    questions: usize,
    answers: usize,
    calls: Vec<(String, String)>,
}

impl Default for ScriptedChatModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::with_evaluation_reply("Verdict: Correct\nFeedback: Well done.")
    }

    pub fn with_evaluation_reply(reply: impl Into<String>) -> Self {
        Self {
            evaluation_reply: reply.into(),
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Every `(system_prompt, user_message)` pair received so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push((system_prompt.to_string(), user_message.to_string()));

        if system_prompt == QUESTION_GENERATION_SYSTEM_PROMPT {
            state.questions += 1;
            Ok(format!("Question {}?", state.questions))
        } else if system_prompt == ANSWER_GENERATION_SYSTEM_PROMPT {
            state.answers += 1;
            Ok(format!("Reference answer {}", state.answers))
        } else if system_prompt == ANSWER_EVALUATION_SYSTEM_PROMPT {
            Ok(self.evaluation_reply.clone())
        } else {
            Err(AppError::LLMParsing("unexpected system prompt".into()))
        }
    }
}

pub async fn test_db() -> SurrealDbClient {
    let database = Uuid::new_v4().to_string();
    let db = SurrealDbClient::memory("quiz_test", &database)
        .await
        .expect("Failed to start in-memory surrealdb");
    db.ensure_initialized()
        .await
        .expect("Failed to initialize schema");
    db
}

/// Indexes `texts` as the chunks of collection `name`.
pub async fn seed_collection(
    db: &SurrealDbClient,
    embeddings: &EmbeddingProvider,
    name: &str,
    texts: &[&str],
) {
    let vectors = embeddings
        .embed_batch(texts.iter().map(|t| (*t).to_string()).collect())
        .await
        .expect("embed chunks");
    let chunks: Vec<TextChunk> = texts
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(position, (text, embedding))| {
            TextChunk::new(name.to_string(), position, (*text).to_string(), embedding)
        })
        .collect();

    let collection = Collection::new(
        name.to_string(),
        format!("{}.docx", name.replace('_', " ")),
        chunks.len(),
        embeddings.dimension(),
        embeddings.model_code(),
    );
    Collection::create_with_chunks(collection, chunks, db)
        .await
        .expect("create collection");
}
