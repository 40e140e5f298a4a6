//! Documents service
//!
//! Stores uploaded files in the blob store and keeps a record of each one.
//! Blob keys have the form "<group>/documents/<uuid><ext>".

use crate::config::MAX_TITLE_LENGTH;
use crate::database::{Document, Repository};
use crate::error::{AppError, Result};
use crate::storage::{BlobReader, BlobStore};
use std::sync::Arc;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Service for managing documents
#[derive(Clone)]
pub struct DocumentsService {
    repo: Repository,
    store: Arc<dyn BlobStore>,
}

impl DocumentsService {
    pub fn new(repo: Repository, store: Arc<dyn BlobStore>) -> Self {
        Self { repo, store }
    }

    /// Store `content` as a new document of `group_id`
    pub async fn create_document(
        &self,
        group_id: &str,
        title: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Document> {
        validate_group_id(group_id)?;
        let title = sanitize_title(title)?;

        tracing::info!("Creating document: {} for group: {}", title, group_id);

        let requested_key = blob_key(group_id, &title);
        let key = self.store.put(&requested_key, content).await?;

        let document = match self.repo.create_document(group_id, &title, &key).await {
            Ok(document) => document,
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&key).await {
                    tracing::warn!("Failed to remove orphaned blob {}: {}", key, cleanup);
                }
                return Err(e);
            }
        };

        tracing::info!("Document created: {}", document.id);

        Ok(document)
    }

    /// Get a document record
    pub async fn get_document(&self, group_id: &str, id: &str) -> Result<Document> {
        self.repo.get_document(group_id, id).await
    }

    /// Get a document record together with a reader over its bytes
    pub async fn open_document(&self, group_id: &str, id: &str) -> Result<(Document, BlobReader)> {
        let document = self.repo.get_document(group_id, id).await?;
        let reader = self.store.get(&document.path).await?;
        Ok((document, reader))
    }

    /// List a group's documents
    pub async fn list_documents(&self, group_id: &str) -> Result<Vec<Document>> {
        self.repo.list_documents(group_id).await
    }

    /// Rename a document. The stored blob keeps its key.
    pub async fn rename_document(&self, group_id: &str, id: &str, title: &str) -> Result<Document> {
        let title = sanitize_title(title)?;
        self.repo.rename_document(group_id, id, &title).await
    }

    /// Delete a document and its blob
    pub async fn delete_document(&self, group_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting document: {}", id);

        let document = self.repo.get_document(group_id, id).await?;

        match self.store.delete(&document.path).await {
            Ok(()) => {}
            Err(AppError::BlobNotFound(key)) => {
                tracing::warn!("Blob for document {} was already gone: {}", id, key);
            }
            Err(e) => return Err(e),
        }

        self.repo.delete_document(group_id, id).await?;

        tracing::info!("Document deleted: {}", id);

        Ok(())
    }
}

/// Build a fresh blob key for a document, keeping the title's extension
fn blob_key(group_id: &str, title: &str) -> String {
    let ext = title
        .rfind('.')
        .filter(|&idx| idx > 0 && idx + 1 < title.len())
        .map(|idx| title[idx..].to_lowercase())
        .unwrap_or_default();

    format!("{}/documents/{}{}", group_id, Uuid::new_v4(), ext)
}

/// Group IDs become a path segment of every blob key
fn validate_group_id(group_id: &str) -> Result<()> {
    if group_id.is_empty()
        || group_id == "."
        || group_id == ".."
        || group_id.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Validation(format!("Invalid group id: {:?}", group_id)));
    }
    Ok(())
}

/// Strip path separators and null bytes, and cap the length
fn sanitize_title(title: &str) -> Result<String> {
    let sanitized: String = title
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_TITLE_LENGTH)
        .collect();

    let sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        return Err(AppError::Validation("Document title must not be empty".to_string()));
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::storage::{LocalBlobStore, MemoryBlobStore};
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    async fn create_memory_service() -> (DocumentsService, MemoryBlobStore) {
        let store = MemoryBlobStore::new();
        let service = DocumentsService::new(create_test_repo().await, Arc::new(store.clone()));
        (service, store)
    }

    async fn create_local_service() -> (DocumentsService, LocalBlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().join("blobs")).await.unwrap();
        let service = DocumentsService::new(create_test_repo().await, Arc::new(store.clone()));
        (service, store, temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_open_document() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"%PDF-1.7 manual";
        let doc = service.create_document("g1", "Manual.PDF", &mut content).await.unwrap();

        assert_eq!(doc.title, "Manual.PDF");
        assert!(doc.path.starts_with("g1/documents/"));
        assert!(doc.path.ends_with(".pdf"));
        assert!(store.contains(&doc.path).await);

        let (opened, mut reader) = service.open_document("g1", &doc.id).await.unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();

        assert_eq!(opened.id, doc.id);
        assert_eq!(data, b"%PDF-1.7 manual");
    }

    #[tokio::test]
    async fn test_create_document_on_local_disk() {
        let (service, store, _temp) = create_local_service().await;

        let mut content: &[u8] = b"receipt";
        let doc = service.create_document("g1", "receipt.jpg", &mut content).await.unwrap();

        assert!(store.root().join(&doc.path).is_file());
        assert_eq!(store.read(&doc.path).await.unwrap(), b"receipt");
    }

    #[tokio::test]
    async fn test_open_legacy_absolute_path() {
        let (service, store, _temp) = create_local_service().await;

        let legacy = store.root().join("g1").join("documents").join("old.pdf");
        std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        std::fs::write(&legacy, b"old layout").unwrap();

        let doc = service
            .repo
            .create_document("g1", "old.pdf", &legacy.to_string_lossy())
            .await
            .unwrap();

        let (_, mut reader) = service.open_document("g1", &doc.id).await.unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"old layout");
    }

    #[tokio::test]
    async fn test_rename_keeps_blob() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"data";
        let doc = service.create_document("g1", "a.txt", &mut content).await.unwrap();
        let renamed = service.rename_document("g1", &doc.id, "b.txt").await.unwrap();

        assert_eq!(renamed.title, "b.txt");
        assert_eq!(renamed.path, doc.path);
        assert!(store.contains(&doc.path).await);
    }

    #[tokio::test]
    async fn test_delete_document_removes_blob() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"data";
        let doc = service.create_document("g1", "a.txt", &mut content).await.unwrap();

        service.delete_document("g1", &doc.id).await.unwrap();

        assert!(store.is_empty().await);
        let result = service.get_document("g1", &doc.id).await;
        assert!(matches!(result, Err(AppError::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_blob() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"data";
        let doc = service.create_document("g1", "a.txt", &mut content).await.unwrap();
        store.delete(&doc.path).await.unwrap();

        service.delete_document("g1", &doc.id).await.unwrap();
        assert!(service.list_documents("g1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_blob_is_not_found() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"data";
        let doc = service.create_document("g1", "a.txt", &mut content).await.unwrap();
        store.delete(&doc.path).await.unwrap();

        let result = service.open_document("g1", &doc.id).await;
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_other_group_cannot_open() {
        let (service, _store) = create_memory_service().await;

        let mut content: &[u8] = b"private";
        let doc = service.create_document("g1", "a.txt", &mut content).await.unwrap();

        let result = service.open_document("g2", &doc.id).await;
        assert!(matches!(result, Err(AppError::DocumentNotFound(_))));
        let result = service.delete_document("g2", &doc.id).await;
        assert!(matches!(result, Err(AppError::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let (service, store) = create_memory_service().await;

        let mut content: &[u8] = b"x";
        let result = service.create_document("../g1", "a.txt", &mut content).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let mut content: &[u8] = b"x";
        let result = service.create_document("g1", "//", &mut content).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(store.is_empty().await);
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("normal.txt").unwrap(), "normal.txt");
        assert_eq!(sanitize_title("../../../etc/passwd").unwrap(), "......etcpasswd");
        assert_eq!(sanitize_title("file\\name.txt").unwrap(), "filename.txt");
        assert_eq!(sanitize_title(&"a".repeat(400)).unwrap().len(), MAX_TITLE_LENGTH);
        assert!(sanitize_title("  ").is_err());
    }

    #[test]
    fn test_blob_key_shape() {
        let key = blob_key("g1", "Photo.JPG");
        assert!(key.starts_with("g1/documents/"));
        assert!(key.ends_with(".jpg"));

        let key = blob_key("g1", "README");
        assert_eq!(key.len(), "g1/documents/".len() + 36);

        assert_ne!(blob_key("g1", "a.pdf"), blob_key("g1", "a.pdf"));
    }
}
