mod config;
mod services;

pub use config::{IngestionConfig, IngestionTuning};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        store::DocumentStore,
        types::{collection::Collection, text_chunk::TextChunk},
    },
    utils::{collection_name::prepare_collection_name, embedding::EmbeddingProvider},
};
use serde::Serialize;
use tracing::{info, warn};

/// Result of asking the pipeline to index a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexOutcome {
    AlreadyIndexed { collection: String },
    Created { collection: String, chunk_count: usize },
}

impl IndexOutcome {
    pub fn collection(&self) -> &str {
        match self {
            Self::AlreadyIndexed { collection } | Self::Created { collection, .. } => collection,
        }
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        documents: DocumentStore,
        embedding_provider: Arc<EmbeddingProvider>,
        pipeline_config: IngestionConfig,
    ) -> Self {
        let services = DefaultPipelineServices::new(documents, embedding_provider);
        Self::with_services(db, pipeline_config, Arc::new(services))
    }

    pub fn with_services(
        db: Arc<SurrealDbClient>,
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            db,
            pipeline_config,
            services,
        }
    }

    /// Builds the vector collection for an uploaded document unless it already exists.
    #[tracing::instrument(skip(self), fields(collection = %prepare_collection_name(file_name)))]
    pub async fn index_document(&self, file_name: &str) -> Result<IndexOutcome, AppError> {
        let collection = prepare_collection_name(file_name);

        if Collection::exists(&collection, &self.db).await? {
            info!(%collection, "Collection already exists, skipping indexing");
            return Ok(IndexOutcome::AlreadyIndexed { collection });
        }

        let tuning = &self.pipeline_config.tuning;
        let started = Instant::now();

        let text = self.services.load_document(file_name).await?;
        let chunks = self.services.split_text(&text, tuning).await?;
        if chunks.is_empty() {
            warn!(%collection, "Document contains no text");
            return Err(AppError::Validation(format!(
                "Document {file_name} contains no text"
            )));
        }
        info!(%collection, chunk_count = chunks.len(), "Amount of chunks for current document");

        let embeddings = self.services.embed_chunks(chunks.clone(), tuning).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::InternalError(format!(
                "expected {} embeddings, received {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let text_chunks: Vec<TextChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (chunk, embedding))| {
                TextChunk::new(collection.clone(), position, chunk, embedding)
            })
            .collect();
        let chunk_count = text_chunks.len();

        let record = Collection::new(
            collection.clone(),
            file_name.to_string(),
            chunk_count,
            self.services.embedding_dimension(),
            self.services.embedding_model(),
        );
        Collection::create_with_chunks(record, text_chunks, &self.db).await?;

        info!(
            %collection,
            chunk_count,
            total_ms = Self::duration_millis(started.elapsed()),
            "ingestion pipeline finished"
        );

        Ok(IndexOutcome::Created {
            collection,
            chunk_count,
        })
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}
