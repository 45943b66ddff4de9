use crate::{error::AppError, utils::config::AppConfig};

use super::types::StoredObject;
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::info;

/// Shared handle to the SurrealDB instance holding sessions, collections and chunks.
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connects and selects the namespace and database.
    ///
    /// Embedded `mem://` addresses have no root user, so sign-in is skipped for them.
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let client = connect(address).await?;

        if !address.starts_with("mem://") {
            client.signin(Root { username, password }).await?;
        }

        client.use_ns(namespace).use_db(database).await?;

        Ok(Self { client })
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        info!(address = %config.surrealdb_address, "Connecting to SurrealDB");
        Self::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await
    }

    pub async fn ensure_initialized(&self) -> Result<(), AppError> {
        self.define_chunk_indexes().await?;
        Ok(())
    }

    /// Chunks are always looked up per collection, optionally in position order.
    async fn define_chunk_indexes(&self) -> Result<(), Error> {
        for statement in [
            "DEFINE INDEX IF NOT EXISTS idx_text_chunk_collection ON text_chunk FIELDS collection",
            "DEFINE INDEX IF NOT EXISTS idx_text_chunk_position ON text_chunk FIELDS collection, position",
        ] {
            self.client.query(statement).await?.check()?;
        }

        Ok(())
    }

    /// Creates a new record; fails if one with the same id exists.
    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    /// Creates or replaces the record with the item's id.
    pub async fn upsert_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .upsert((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    /// Deletes by id, returning the removed record if there was one.
    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let client = connect("mem://").await?;

        client.use_ns(namespace).use_db(database).await?;

        Ok(Self { client })
    }
}
