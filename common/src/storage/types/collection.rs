use tracing::info;

use crate::{
    error::AppError,
    storage::{db::SurrealDbClient, types::text_chunk::TextChunk},
    stored_object,
};

// The record key is the collection name derived from the uploaded file name.
stored_object!(Collection, "collection", {
    file_name: String,
    chunk_count: usize,
    dimension: usize,
    embedding_model: Option<String>
});

/// Outcome of a collection lookup, reported to callers instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CollectionStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "Failure")]
    Failure { error_message: String },
}

impl CollectionStatus {
    pub fn missing(name: &str) -> Self {
        Self::Failure {
            error_message: format!("Collection {name} doesn't exist."),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Collection {
    pub fn new(
        name: String,
        file_name: String,
        chunk_count: usize,
        dimension: usize,
        embedding_model: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: name,
            created_at: now,
            updated_at: now,
            file_name,
            chunk_count,
            dimension,
            embedding_model,
        }
    }

    pub fn name(&self) -> &str {
        &self.id
    }

    pub async fn exists(name: &str, db: &SurrealDbClient) -> Result<bool, AppError> {
        Ok(db.get_item::<Self>(name).await?.is_some())
    }

    pub async fn check_exists(
        name: &str,
        db: &SurrealDbClient,
    ) -> Result<CollectionStatus, AppError> {
        if Self::exists(name, db).await? {
            Ok(CollectionStatus::Success)
        } else {
            Ok(CollectionStatus::missing(name))
        }
    }

    /// Persists the collection together with its embedded chunks.
    ///
    /// Chunks left behind by an earlier, interrupted attempt are removed first so a
    /// collection never holds duplicates. The collection record is written last; its
    /// presence marks the index as complete.
    pub async fn create_with_chunks(
        collection: Self,
        chunks: Vec<TextChunk>,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        TextChunk::delete_by_collection(collection.name(), db).await?;

        for chunk in chunks {
            db.store_item(chunk).await?;
        }

        let name = collection.id.clone();
        let stored = db.store_item(collection).await?.ok_or_else(|| {
            AppError::InternalError(format!("collection {name} was not persisted"))
        })?;

        info!(
            collection = %stored.id,
            chunk_count = stored.chunk_count,
            "Collection created"
        );

        Ok(stored)
    }

    /// Removes the collection and every chunk it holds. Returns whether it existed.
    pub async fn delete(name: &str, db: &SurrealDbClient) -> Result<bool, AppError> {
        TextChunk::delete_by_collection(name, db).await?;
        let deleted = db.delete_item::<Self>(name).await?;

        if deleted.is_some() {
            info!(collection = %name, "Collection deleted");
        }

        Ok(deleted.is_some())
    }
}
