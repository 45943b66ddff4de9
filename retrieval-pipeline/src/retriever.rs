use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{collection::Collection, text_chunk::TextChunk},
    },
    utils::embedding::EmbeddingProvider,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// A chunk selected as context, with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub position: usize,
    pub chunk: String,
    pub score: f32,
}

/// Similarity retriever bound to one document collection.
#[derive(Debug, Clone)]
pub struct CollectionRetriever {
    collection: String,
    top_k: usize,
}

impl CollectionRetriever {
    pub fn new(collection: impl Into<String>, top_k: usize) -> Self {
        Self {
            collection: collection.into(),
            top_k: top_k.max(1),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Returns the `top_k` chunks most similar to `query`, best first.
    #[instrument(skip_all, fields(collection = %self.collection, top_k = self.top_k))]
    pub async fn retrieve(
        &self,
        db: &SurrealDbClient,
        embeddings: &EmbeddingProvider,
        query: &str,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let collection: Collection = db
            .get_item(&self.collection)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Collection {} doesn't exist.", self.collection))
            })?;

        let query_embedding = embeddings.embed(query).await?;
        if query_embedding.len() != collection.dimension {
            return Err(AppError::Validation(format!(
                "Query embedding has {} dimensions but collection {} was indexed with {}",
                query_embedding.len(),
                self.collection,
                collection.dimension
            )));
        }

        let chunks =
            TextChunk::similarity_search(&self.collection, query_embedding, self.top_k, db)
                .await?;
        debug!(retrieved = chunks.len(), "Retrieved context chunks");

        Ok(chunks
            .into_iter()
            .map(|scored| RetrievedChunk {
                id: scored.id,
                position: scored.position,
                chunk: scored.chunk,
                score: scored.score,
            })
            .collect())
    }
}

/// Joins retrieved chunks into the context block used by the prompts.
pub fn chunks_to_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.chunk.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn seeded_db(provider: &EmbeddingProvider) -> SurrealDbClient {
        let database = Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("retrieval_test", &database)
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("init");

        let texts = [
            "Mitochondria produce ATP for the cell",
            "Chloroplasts perform photosynthesis in plants",
            "Volcanoes erupt molten rock called lava",
        ];
        let mut chunks = Vec::new();
        for (position, text) in texts.iter().enumerate() {
            let embedding = provider.embed(text).await.expect("embed");
            chunks.push(TextChunk::new("bio".into(), position, (*text).into(), embedding));
        }
        let collection = Collection::new(
            "bio".into(),
            "bio.docx".into(),
            chunks.len(),
            provider.dimension(),
            None,
        );
        Collection::create_with_chunks(collection, chunks, &db)
            .await
            .expect("create collection");
        db
    }

    #[tokio::test]
    async fn test_retrieve_returns_top_k_best_first() {
        let provider = EmbeddingProvider::new_hashed(64);
        let db = seeded_db(&provider).await;
        let retriever = CollectionRetriever::new("bio", 2);

        let chunks = retriever
            .retrieve(&db, &provider, "Mitochondria produce ATP for the cell")
            .await
            .expect("retrieve");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk, "Mitochondria produce ATP for the cell");
        assert_eq!(chunks[0].position, 0);
        assert!(chunks[0].score >= chunks[1].score);
    }

    #[tokio::test]
    async fn test_retrieve_missing_collection() {
        let provider = EmbeddingProvider::new_hashed(8);
        let database = Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("retrieval_test", &database)
            .await
            .expect("db");

        let err = CollectionRetriever::new("absent", 2)
            .retrieve(&db, &provider, "anything")
            .await
            .expect_err("missing collection");

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(err.to_string().contains("Collection absent doesn't exist."));
    }

    #[tokio::test]
    async fn test_retrieve_rejects_dimension_mismatch() {
        let provider = EmbeddingProvider::new_hashed(64);
        let db = seeded_db(&provider).await;

        let err = CollectionRetriever::new("bio", 2)
            .retrieve(&db, &EmbeddingProvider::new_hashed(32), "ATP")
            .await
            .expect_err("dimension mismatch");

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_chunks_to_context_joins_in_order() {
        let chunks = vec![
            RetrievedChunk {
                id: "a".into(),
                position: 3,
                chunk: " first ".into(),
                score: 0.9,
            },
            RetrievedChunk {
                id: "b".into(),
                position: 1,
                chunk: "second".into(),
                score: 0.4,
            },
        ];

        assert_eq!(chunks_to_context(&chunks), "first\n\nsecond");
        assert_eq!(chunks_to_context(&[]), "");
        assert_eq!(CollectionRetriever::new("x", 0).top_k(), 1);
    }
}
