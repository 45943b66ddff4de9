use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore, PutMode, PutOptions};
use tracing::{debug, info};

use crate::error::AppError;
use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Prefix under which uploaded documents are kept.
pub const DOCUMENTS_PREFIX: &str = "docs";

/// Thin wrapper over an `ObjectStore` backend chosen from configuration.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
}

impl StorageManager {
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
        })
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    pub fn local_base_path(&self) -> Option<&std::path::Path> {
        self.local_base.as_deref()
    }

    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Writes only if nothing exists at `location`; otherwise fails with `AlreadyExists`.
    pub async fn put_new(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        let opts = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };
        self.store.put_opts(&path, payload, opts).await.map(|_| ())
    }

    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    pub async fn delete(&self, location: &str) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        self.store.delete(&path).await
    }

    /// List all objects below the specified prefix.
    pub async fn list(
        &self,
        prefix: Option<&str>,
    ) -> object_store::Result<Vec<object_store::ObjectMeta>> {
        let prefix_path = prefix.map(ObjPath::from);
        self.store.list(prefix_path.as_ref()).try_collect().await
    }

    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }
}

/// Uploaded documents, addressed by the file name they were uploaded under.
///
/// File names are global: every session sees the same set of documents.
#[derive(Clone)]
pub struct DocumentStore {
    storage: StorageManager,
}

impl DocumentStore {
    pub fn new(storage: StorageManager) -> Self {
        Self { storage }
    }

    /// Maps a file name to its object location.
    ///
    /// The name must survive the round trip unchanged: it is the key listed by
    /// `list_file_names` and the source of the collection name, so names that the store
    /// would trim, split or percent-encode are rejected.
    fn location(file_name: &str) -> Result<String, AppError> {
        let invalid = || AppError::Validation(format!("Invalid file name: {file_name:?}"));

        if file_name.is_empty()
            || file_name.trim() != file_name
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            return Err(invalid());
        }

        let location = format!("{DOCUMENTS_PREFIX}/{file_name}");
        if ObjPath::from(location.as_str()).filename() != Some(file_name) {
            return Err(invalid());
        }

        Ok(location)
    }

    pub async fn exists(&self, file_name: &str) -> Result<bool, AppError> {
        let location = Self::location(file_name)?;
        Ok(self.storage.exists(&location).await?)
    }

    /// Stores a new document; an existing document with the same name is never overwritten.
    ///
    /// The existence check and the write are one conditional put, so concurrent uploads of
    /// the same name cannot both succeed.
    pub async fn save_new(&self, file_name: &str, data: Bytes) -> Result<(), AppError> {
        let location = Self::location(file_name)?;

        let size = data.len();
        match self.storage.put_new(&location, data).await {
            Ok(()) => {}
            Err(object_store::Error::AlreadyExists { .. }) => {
                return Err(AppError::Conflict(format!(
                    "A file with file name \"{file_name}\" already exists. Please upload a different file."
                )));
            }
            Err(err) => return Err(err.into()),
        }
        info!(file_name = %file_name, size, "Stored uploaded document");

        Ok(())
    }

    pub async fn read(&self, file_name: &str) -> Result<Bytes, AppError> {
        let location = Self::location(file_name)?;
        match self.storage.get(&location).await {
            Ok(bytes) => Ok(bytes),
            Err(object_store::Error::NotFound { .. }) => {
                Err(AppError::NotFound(format!("File {file_name} not found")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the document. Returns whether it existed.
    pub async fn delete(&self, file_name: &str) -> Result<bool, AppError> {
        let location = Self::location(file_name)?;
        if !self.storage.exists(&location).await? {
            return Ok(false);
        }

        self.storage.delete(&location).await?;
        debug!(file_name = %file_name, "Deleted stored document");
        Ok(true)
    }

    /// Names of all stored documents, sorted.
    pub async fn list_file_names(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self
            .storage
            .list(Some(DOCUMENTS_PREFIX))
            .await?
            .into_iter()
            .filter_map(|meta| meta.location.filename().map(str::to_string))
            .collect();
        names.sort();

        Ok(names)
    }
}

async fn create_storage_backend(
    cfg: &AppConfig,
) -> object_store::Result<(DynStore, Option<PathBuf>)> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())?;
            Ok((Arc::new(store), Some(base)))
        }
        StorageKind::Memory => Ok((Arc::new(InMemory::new()), None)),
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;

    pub fn test_config_memory() -> AppConfig {
        AppConfig {
            openai_api_key: "test".into(),
            data_dir: "/tmp/unused".into(),
            http_port: 0,
            storage: StorageKind::Memory,
            ..Default::default()
        }
    }

    /// In-memory document store for tests.
    pub async fn memory_document_store() -> object_store::Result<DocumentStore> {
        let storage = StorageManager::new(&test_config_memory()).await?;
        Ok(DocumentStore::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_storage_manager_memory_basic_operations() {
        let storage = StorageManager::new(&test_config_memory())
            .await
            .expect("create storage manager");
        assert!(storage.local_base_path().is_none());

        let location = "test/data/file.txt";
        storage
            .put(location, Bytes::from_static(b"payload"))
            .await
            .expect("put");
        assert!(storage.exists(location).await.expect("exists"));
        assert_eq!(storage.get(location).await.expect("get").as_ref(), b"payload");

        storage.delete(location).await.expect("delete");
        assert!(!storage.exists(location).await.expect("exists after delete"));
    }

    #[tokio::test]
    async fn test_storage_manager_local_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            storage: StorageKind::Local,
            ..test_config_memory()
        };
        let storage = StorageManager::new(&cfg).await.expect("create local storage");

        storage
            .put("docs/a.docx", Bytes::from_static(b"abc"))
            .await
            .expect("put");
        assert_eq!(storage.local_base_path(), Some(dir.path()));
        assert!(dir.path().join("docs/a.docx").exists());
        assert_eq!(storage.list(Some("docs")).await.expect("list").len(), 1);

        storage.delete("docs/a.docx").await.expect("delete");
        assert!(storage.list(Some("docs")).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_document_store_rejects_duplicate_names() {
        let documents = memory_document_store().await.expect("store");

        documents
            .save_new("Notes.docx", Bytes::from_static(b"first"))
            .await
            .expect("first save");

        let err = documents
            .save_new("Notes.docx", Bytes::from_static(b"second"))
            .await
            .expect_err("duplicate should be rejected");
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "A file with file name \"Notes.docx\" already exists. Please upload a different file."
        );

        let stored = documents.read("Notes.docx").await.expect("read");
        assert_eq!(stored.as_ref(), b"first");
    }

    #[tokio::test]
    async fn test_document_store_list_and_delete() {
        let documents = memory_document_store().await.expect("store");

        for name in ["b.docx", "a.docx"] {
            documents
                .save_new(name, Bytes::from_static(b"x"))
                .await
                .expect("save");
        }

        assert_eq!(
            documents.list_file_names().await.expect("list"),
            vec!["a.docx".to_string(), "b.docx".to_string()]
        );

        assert!(documents.delete("a.docx").await.expect("delete"));
        assert!(!documents.delete("a.docx").await.expect("second delete"));
        assert!(matches!(
            documents.read("a.docx").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_document_store_rejects_path_like_names() {
        let documents = memory_document_store().await.expect("store");

        for name in ["", "../x.docx", "dir/x.docx", "..", "."] {
            let result = documents.save_new(name, Bytes::from_static(b"x")).await;
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_document_store_keeps_names_verbatim() {
        let documents = memory_document_store().await.expect("store");

        for name in [" notes.docx", "notes.docx ", "100%.docx", "what?.docx", "a\nb.docx"] {
            let result = documents.save_new(name, Bytes::from_static(b"x")).await;
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(documents.list_file_names().await.expect("list").is_empty());

        documents
            .save_new("Lecture notes week 2.docx", Bytes::from_static(b"x"))
            .await
            .expect("plain name is accepted");
        assert_eq!(
            documents.list_file_names().await.expect("list"),
            vec!["Lecture notes week 2.docx".to_string()]
        );
        assert!(documents
            .exists("Lecture notes week 2.docx")
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_same_name_accept_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            storage: StorageKind::Local,
            ..test_config_memory()
        };
        let documents = DocumentStore::new(
            StorageManager::new(&cfg).await.expect("create local storage"),
        );

        for round in 0..20 {
            let name = format!("race {round}.docx");
            let (first, second) = tokio::join!(
                documents.save_new(&name, Bytes::from_static(b"first")),
                documents.save_new(&name, Bytes::from_static(b"second")),
            );

            let outcomes = [first, second];
            let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
            let conflicts = outcomes
                .iter()
                .filter(|r| matches!(r, Err(AppError::Conflict(_))))
                .count();
            assert_eq!((accepted, conflicts), (1, 1), "round {round}");

            let stored = documents.read(&name).await.expect("read");
            let winner: &[u8] = if outcomes[0].is_ok() { b"first" } else { b"second" };
            assert_eq!(stored.as_ref(), winner, "round {round}");
        }
    }
}
