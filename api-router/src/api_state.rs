use std::sync::Arc;

use common::{
    storage::{db::SurrealDbClient, store::DocumentStore},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use ingestion_pipeline::{IngestionConfig, IngestionPipeline};
use retrieval_pipeline::{ChatModel, QuizEngine, QuizSettings};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub documents: DocumentStore,
    pub ingestion: Arc<IngestionPipeline>,
    pub quiz: Arc<QuizEngine>,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        db: Arc<SurrealDbClient>,
        documents: DocumentStore,
        embeddings: Arc<EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        let ingestion = IngestionPipeline::new(
            Arc::clone(&db),
            documents.clone(),
            Arc::clone(&embeddings),
            IngestionConfig::from_app_config(config),
        );
        let quiz = QuizEngine::new(
            Arc::clone(&db),
            embeddings,
            chat,
            QuizSettings::from_app_config(config),
        );

        Self {
            db,
            config: config.clone(),
            documents,
            ingestion: Arc::new(ingestion),
            quiz: Arc::new(quiz),
        }
    }
}
