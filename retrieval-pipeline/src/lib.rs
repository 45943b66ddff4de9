pub mod chat_model;
pub mod evaluation;
pub mod quiz;
pub mod quiz_generation;
pub mod retriever;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use chat_model::{ChatModel, OpenAIChatModel};
pub use evaluation::{Evaluation, Verdict};
pub use quiz::{AnswerTurn, ClearOutcome, QuizEngine, QuizSettings};
pub use retriever::{chunks_to_context, CollectionRetriever, RetrievedChunk};
