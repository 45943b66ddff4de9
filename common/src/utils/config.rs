use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API key not found. Please set the OPENAI_API_KEY environment variable.";

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    OpenAI,
    Hashed,
}

/// How a user's answer is scored against the reference answer.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Cosine,
    Llm,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

fn default_embedding_backend() -> EmbeddingBackendKind {
    EmbeddingBackendKind::OpenAI
}

fn default_evaluation_mode() -> EvaluationMode {
    EvaluationMode::Cosine
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_surrealdb_address")]
    pub surrealdb_address: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_username: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_password: String,
    #[serde(default = "default_surrealdb_scope")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surrealdb_scope")]
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackendKind,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_evaluation_mode")]
    pub evaluation_mode: EvaluationMode,
    #[serde(default = "default_evaluation_pass_threshold")]
    pub evaluation_pass_threshold: f32,
    #[serde(default = "default_stream_word_delay_ms")]
    pub stream_word_delay_ms: u64,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_surrealdb_address() -> String {
    "mem://".to_string()
}

fn default_surrealdb_credential() -> String {
    "root".to_string()
}

fn default_surrealdb_scope() -> String {
    "docquiz".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

const fn default_http_port() -> u16 {
    3000
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

const fn default_embedding_dimensions() -> u32 {
    3072
}

const fn default_chunk_size() -> usize {
    2800
}

const fn default_chunk_overlap() -> usize {
    280
}

const fn default_retrieval_top_k() -> usize {
    2
}

const fn default_evaluation_pass_threshold() -> f32 {
    0.8
}

const fn default_stream_word_delay_ms() -> u64 {
    50
}

const fn default_upload_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            surrealdb_address: default_surrealdb_address(),
            surrealdb_username: default_surrealdb_credential(),
            surrealdb_password: default_surrealdb_credential(),
            surrealdb_namespace: default_surrealdb_scope(),
            surrealdb_database: default_surrealdb_scope(),
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            http_port: default_http_port(),
            chat_model: default_chat_model(),
            embedding_backend: default_embedding_backend(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            retrieval_top_k: default_retrieval_top_k(),
            evaluation_mode: default_evaluation_mode(),
            evaluation_pass_threshold: default_evaluation_pass_threshold(),
            stream_word_delay_ms: default_stream_word_delay_ms(),
            upload_max_body_bytes: default_upload_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Rejects configurations that cannot talk to the model provider.
    ///
    /// The chat model always needs a key; a blank one is a fatal error.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::Message(MISSING_API_KEY_MESSAGE.to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Message(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.retrieval_top_k == 0 {
            return Err(ConfigError::Message(
                "retrieval_top_k must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default().try_parsing(true))
        .build()?;

    config.try_deserialize::<AppConfig>()?.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_quiz_parameters() {
        let config = AppConfig::default();

        assert_eq!(config.chunk_size, 2800);
        assert_eq!(config.chunk_overlap, 280);
        assert_eq!(config.retrieval_top_k, 2);
        assert_eq!(config.embedding_model, "text-embedding-3-large");
        assert_eq!(config.evaluation_mode, EvaluationMode::Cosine);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = AppConfig::default()
            .validate()
            .expect_err("blank key should be rejected");

        assert!(err.to_string().contains(MISSING_API_KEY_MESSAGE));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let config = AppConfig {
            openai_api_key: "sk-test".into(),
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        let config = AppConfig {
            openai_api_key: "sk-test".into(),
            ..Default::default()
        };

        let validated = config.validate().expect("config should validate");
        assert_eq!(validated.openai_api_key, "sk-test");
    }

    #[test]
    fn test_deserializes_from_source_values() {
        let config = Config::builder()
            .set_override("openai_api_key", "sk-from-source")
            .and_then(|b| b.set_override("storage", "memory"))
            .and_then(|b| b.set_override("evaluation_mode", "llm"))
            .and_then(|b| b.set_override("http_port", 8080))
            .expect("overrides")
            .build()
            .expect("build config");

        let parsed: AppConfig = config.try_deserialize().expect("deserialize");
        assert_eq!(parsed.openai_api_key, "sk-from-source");
        assert_eq!(parsed.storage, StorageKind::Memory);
        assert_eq!(parsed.evaluation_mode, EvaluationMode::Llm);
        assert_eq!(parsed.http_port, 8080);
        assert_eq!(parsed.chunk_size, 2800);
    }
}
