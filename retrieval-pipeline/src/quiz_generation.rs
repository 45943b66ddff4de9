use common::{
    error::AppError,
    storage::db::SurrealDbClient,
    utils::{
        embedding::EmbeddingProvider,
        prompts::{
            answer_user_message, question_user_message, ANSWER_GENERATION_SYSTEM_PROMPT,
            QUESTION_GENERATION_SYSTEM_PROMPT, QUESTION_RETRIEVAL_QUERY,
        },
    },
};
use tracing::{debug, instrument};

use crate::{
    chat_model::ChatModel,
    retriever::{chunks_to_context, CollectionRetriever},
};

/// Asks the chat model for a new question grounded in the document.
///
/// Questions already asked in this session are listed in the prompt so the
/// model avoids repeating them.
#[instrument(skip_all, fields(collection = %retriever.collection(), previous = previous_questions.len()))]
pub async fn generate_question(
    chat: &dyn ChatModel,
    db: &SurrealDbClient,
    embeddings: &EmbeddingProvider,
    retriever: &CollectionRetriever,
    previous_questions: &[String],
) -> Result<String, AppError> {
    let chunks = retriever
        .retrieve(db, embeddings, QUESTION_RETRIEVAL_QUERY)
        .await?;
    let context = chunks_to_context(&chunks);

    let user_message = question_user_message(&context, previous_questions);
    let question = chat
        .complete(QUESTION_GENERATION_SYSTEM_PROMPT, &user_message)
        .await?
        .trim()
        .to_string();

    debug!(%question, "Generated question");
    Ok(question)
}

/// Produces the reference answer for `question` from the retrieved context.
#[instrument(skip_all, fields(collection = %retriever.collection()))]
pub async fn generate_answer(
    chat: &dyn ChatModel,
    db: &SurrealDbClient,
    embeddings: &EmbeddingProvider,
    retriever: &CollectionRetriever,
    question: &str,
) -> Result<String, AppError> {
    let chunks = retriever.retrieve(db, embeddings, question).await?;
    let context = chunks_to_context(&chunks);

    let user_message = answer_user_message(&context, question);
    let answer = chat
        .complete(ANSWER_GENERATION_SYSTEM_PROMPT, &user_message)
        .await?
        .trim()
        .to_string();

    debug!(%answer, "Generated reference answer");
    Ok(answer)
}
