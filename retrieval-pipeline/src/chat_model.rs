use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use common::error::AppError;
use tracing::debug;

/// Text generation seam used by question, answer and evaluation prompts.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError>;
}

pub struct OpenAIChatModel {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAIChatModel {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn create_chat_request(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        Ok(CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_prompt).into(),
                ChatCompletionRequestUserMessage::from(user_message).into(),
            ])
            .build()?)
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError> {
        let request = self.create_chat_request(system_prompt, user_message)?;
        let response = self.client.chat().create(request).await?;
        let content = process_llm_response(response)?;

        debug!(model = %self.model, chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

pub fn process_llm_response(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(AppError::LLMParsing(
            "No content found in LLM response".into(),
        ))
}
