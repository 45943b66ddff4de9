use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::{
    error::AppError,
    storage::store::DocumentStore,
    utils::embedding::EmbeddingProvider,
};
use tracing::debug;

use crate::utils::{document_loader, splitter};

use super::config::IngestionTuning;

/// External capabilities the indexing flow depends on.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn load_document(&self, file_name: &str) -> Result<String, AppError>;

    async fn split_text(&self, text: &str, tuning: &IngestionTuning)
        -> Result<Vec<String>, AppError>;

    async fn embed_chunks(
        &self,
        chunks: Vec<String>,
        tuning: &IngestionTuning,
    ) -> Result<Vec<Vec<f32>>, AppError>;

    fn embedding_dimension(&self) -> usize;

    fn embedding_model(&self) -> Option<String>;
}

pub struct DefaultPipelineServices {
    documents: DocumentStore,
    embedding_provider: Arc<EmbeddingProvider>,
}

impl DefaultPipelineServices {
    pub fn new(documents: DocumentStore, embedding_provider: Arc<EmbeddingProvider>) -> Self {
        Self {
            documents,
            embedding_provider,
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn load_document(&self, file_name: &str) -> Result<String, AppError> {
        document_loader::ensure_supported(file_name)?;
        let bytes: Bytes = self.documents.read(file_name).await?;

        let name = file_name.to_string();
        let text =
            tokio::task::spawn_blocking(move || document_loader::extract_text(&name, &bytes))
                .await??;

        debug!(file_name = %file_name, chars = text.len(), "Document text extracted");
        Ok(text)
    }

    async fn split_text(
        &self,
        text: &str,
        tuning: &IngestionTuning,
    ) -> Result<Vec<String>, AppError> {
        splitter::split_text(text, tuning.chunk_size, tuning.chunk_overlap)
    }

    async fn embed_chunks(
        &self,
        chunks: Vec<String>,
        tuning: &IngestionTuning,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        let batch_size = tuning.embedding_batch_size.max(1);
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let batch_embeddings = self.embedding_provider.embed_batch(batch.to_vec()).await?;
            embeddings.extend(batch_embeddings);
        }

        Ok(embeddings)
    }

    fn embedding_dimension(&self) -> usize {
        self.embedding_provider.dimension()
    }

    fn embedding_model(&self) -> Option<String> {
        self.embedding_provider.model_code()
    }
}
