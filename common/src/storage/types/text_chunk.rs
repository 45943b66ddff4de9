use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};
use uuid::Uuid;

stored_object!(TextChunk, "text_chunk", {
    collection: String,
    position: usize,
    chunk: String,
    embedding: Vec<f32>
});

/// A chunk returned by similarity search together with its cosine similarity to the query.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScoredChunk {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub position: usize,
    pub chunk: String,
    pub score: f32,
}

impl TextChunk {
    pub fn new(collection: String, position: usize, chunk: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            collection,
            position,
            chunk,
            embedding,
        }
    }

    pub async fn delete_by_collection(
        collection: &str,
        db_client: &SurrealDbClient,
    ) -> Result<(), AppError> {
        db_client
            .client
            .query("DELETE type::table($table) WHERE collection = $collection")
            .bind(("table", Self::table_name()))
            .bind(("collection", collection.to_owned()))
            .await?
            .check()?;

        Ok(())
    }

    pub async fn count_by_collection(
        collection: &str,
        db_client: &SurrealDbClient,
    ) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }

        let row: Option<CountRow> = db_client
            .client
            .query("SELECT count() FROM type::table($table) WHERE collection = $collection GROUP ALL")
            .bind(("table", Self::table_name()))
            .bind(("collection", collection.to_owned()))
            .await?
            .take(0)?;

        Ok(row.map_or(0, |row| row.count))
    }

    /// All chunks of a collection in document order.
    pub async fn list_by_collection(
        collection: &str,
        db_client: &SurrealDbClient,
    ) -> Result<Vec<Self>, AppError> {
        Ok(db_client
            .client
            .query("SELECT * FROM type::table($table) WHERE collection = $collection ORDER BY position ASC")
            .bind(("table", Self::table_name()))
            .bind(("collection", collection.to_owned()))
            .await?
            .take(0)?)
    }

    /// Returns the `take` chunks of `collection` most similar to `embedding`, best first.
    pub async fn similarity_search(
        collection: &str,
        embedding: Vec<f32>,
        take: usize,
        db_client: &SurrealDbClient,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let sql = r#"
            SELECT
                id,
                position,
                chunk,
                vector::similarity::cosine(embedding, $embedding) AS score
            FROM type::table($table)
            WHERE collection = $collection
            ORDER BY score DESC
            LIMIT $take;
        "#;

        Ok(db_client
            .client
            .query(sql)
            .bind(("table", Self::table_name()))
            .bind(("collection", collection.to_owned()))
            .bind(("embedding", embedding))
            .bind(("take", take))
            .await?
            .take(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SurrealDbClient {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    #[tokio::test]
    async fn test_text_chunk_creation() {
        let embedding = vec![0.1, 0.2, 0.3];
        let text_chunk = TextChunk::new(
            "Lecture_notes".to_string(),
            3,
            "Photosynthesis happens in chloroplasts".to_string(),
            embedding.clone(),
        );

        assert_eq!(text_chunk.collection, "Lecture_notes");
        assert_eq!(text_chunk.position, 3);
        assert_eq!(text_chunk.embedding, embedding);
        assert!(!text_chunk.id.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_search_ranks_and_limits() {
        let db = setup_test_db().await;

        let chunks = [
            TextChunk::new("notes".into(), 0, "about cells".into(), vec![1.0, 0.0, 0.0]),
            TextChunk::new("notes".into(), 1, "about plants".into(), vec![0.7, 0.7, 0.0]),
            TextChunk::new("notes".into(), 2, "about rocks".into(), vec![0.0, 0.0, 1.0]),
            TextChunk::new("other".into(), 0, "other doc".into(), vec![1.0, 0.0, 0.0]),
        ];
        for chunk in chunks {
            db.store_item(chunk).await.expect("Failed to store chunk");
        }

        let results = TextChunk::similarity_search("notes", vec![1.0, 0.1, 0.0], 2, &db)
            .await
            .expect("similarity search failed");

        assert_eq!(results.len(), 2, "search should honor the take limit");
        assert_eq!(results[0].chunk, "about cells");
        assert_eq!(results[1].chunk, "about plants");
        assert!(results[0].score >= results[1].score);
        assert!(
            results.iter().all(|r| r.chunk != "other doc"),
            "search must stay inside the requested collection"
        );
    }

    #[tokio::test]
    async fn test_similarity_search_on_empty_collection() {
        let db = setup_test_db().await;

        let results = TextChunk::similarity_search("missing", vec![1.0, 0.0], 2, &db)
            .await
            .expect("similarity search failed");

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_count_by_collection() {
        let db = setup_test_db().await;

        for position in 0..3 {
            db.store_item(TextChunk::new(
                "keep".into(),
                position,
                format!("keep {position}"),
                vec![1.0],
            ))
            .await
            .expect("store");
        }
        db.store_item(TextChunk::new("drop".into(), 0, "drop".into(), vec![1.0]))
            .await
            .expect("store");

        assert_eq!(TextChunk::count_by_collection("keep", &db).await.unwrap(), 3);
        assert_eq!(TextChunk::count_by_collection("drop", &db).await.unwrap(), 1);

        TextChunk::delete_by_collection("drop", &db)
            .await
            .expect("delete by collection");

        assert_eq!(TextChunk::count_by_collection("drop", &db).await.unwrap(), 0);
        assert_eq!(TextChunk::count_by_collection("keep", &db).await.unwrap(), 3);

        let ordered = TextChunk::list_by_collection("keep", &db).await.unwrap();
        let positions: Vec<usize> = ordered.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}
