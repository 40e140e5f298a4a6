//! Attachments service
//!
//! Links documents to inventory items and hands out short-lived download
//! tokens for them. Integrates Repository, DocumentsService and TokenCache.

use super::documents::DocumentsService;
use super::tokens::{generate_token, TokenCache};
use crate::database::{
    Attachment, AttachmentType, CreateAttachmentRequest, Document, Repository, UpdateAttachmentRequest,
};
use crate::error::{AppError, Result};
use crate::storage::BlobReader;
use std::time::Duration;
use tokio::io::AsyncRead;

/// What a download token grants access to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadGrant {
    pub group_id: String,
    pub document_id: String,
}

/// Service for managing item attachments
#[derive(Clone)]
pub struct AttachmentsService {
    repo: Repository,
    documents: DocumentsService,
    tokens: TokenCache<DownloadGrant>,
    token_ttl: Duration,
}

impl AttachmentsService {
    pub fn new(repo: Repository, documents: DocumentsService, token_ttl: Duration) -> Self {
        Self {
            repo,
            documents,
            tokens: TokenCache::new(),
            token_ttl,
        }
    }

    /// Upload `content` as a document and attach it to an item
    pub async fn attach(
        &self,
        group_id: &str,
        item_id: &str,
        title: &str,
        attachment_type: AttachmentType,
        is_primary: bool,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Attachment> {
        tracing::info!("Attaching {} ({}) to item: {}", title, attachment_type, item_id);

        let document = self.documents.create_document(group_id, title, content).await?;

        let req = CreateAttachmentRequest {
            item_id: item_id.to_string(),
            document_id: document.id.clone(),
            attachment_type,
            is_primary,
        };

        match self.repo.create_attachment(req).await {
            Ok(attachment) => {
                tracing::info!("Attachment created: {}", attachment.id);
                Ok(attachment)
            }
            Err(e) => {
                if let Err(cleanup) = self.documents.delete_document(group_id, &document.id).await {
                    tracing::warn!("Failed to remove document {} after attach failure: {}", document.id, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Get an attachment and its document, checking group ownership
    pub async fn get_attachment(&self, group_id: &str, id: &str) -> Result<(Attachment, Document)> {
        let attachment = self.repo.get_attachment(id).await?;
        let document = self
            .documents
            .get_document(group_id, &attachment.document_id)
            .await
            .map_err(|e| match e {
                AppError::DocumentNotFound(_) => AppError::AttachmentNotFound(id.to_string()),
                other => other,
            })?;
        Ok((attachment, document))
    }

    /// List a group's attachments for an item
    pub async fn list_attachments(&self, group_id: &str, item_id: &str) -> Result<Vec<Attachment>> {
        self.repo.list_attachments(group_id, item_id).await
    }

    /// Change an attachment's type or primary flag
    pub async fn update_attachment(&self, group_id: &str, req: UpdateAttachmentRequest) -> Result<Attachment> {
        self.get_attachment(group_id, &req.id).await?;
        self.repo.update_attachment(req).await
    }

    /// Delete an attachment along with its document and blob
    pub async fn delete_attachment(&self, group_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting attachment: {}", id);

        let (_, document) = self.get_attachment(group_id, id).await?;

        // Removing the document cascades to the attachment row.
        self.documents.delete_document(group_id, &document.id).await?;

        tracing::info!("Attachment deleted: {}", id);

        Ok(())
    }

    /// Issue a raw token that opens the attachment until the TTL elapses
    pub async fn issue_download_token(&self, group_id: &str, attachment_id: &str) -> Result<String> {
        let (_, document) = self.get_attachment(group_id, attachment_id).await?;

        let token = generate_token();
        let grant = DownloadGrant {
            group_id: group_id.to_string(),
            document_id: document.id,
        };
        self.tokens.insert(&token, grant, self.token_ttl).await;

        tracing::debug!("Issued download token for attachment: {}", attachment_id);

        Ok(token)
    }

    /// Open the document behind a download token
    pub async fn open_with_token(&self, raw_token: &str) -> Result<(Document, BlobReader)> {
        let grant = self.tokens.get(raw_token).await.ok_or(AppError::InvalidToken)?;
        self.documents
            .open_document(&grant.group_id, &grant.document_id)
            .await
    }

    /// Token cache shared with the maintenance scheduler
    pub fn tokens(&self) -> TokenCache<DownloadGrant> {
        self.tokens.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::storage::{BlobStore, LocalBlobStore};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn create_test_service(token_ttl: Duration) -> (AttachmentsService, LocalBlobStore, TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);

        let temp_dir = TempDir::new().unwrap();
        let blob_store = LocalBlobStore::new(temp_dir.path().join("blobs")).await.unwrap();
        let documents = DocumentsService::new(repo.clone(), Arc::new(blob_store.clone()));

        (AttachmentsService::new(repo, documents, token_ttl), blob_store, temp_dir)
    }

    async fn read_all(mut reader: BlobReader) -> Vec<u8> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();
        data
    }

    #[tokio::test]
    async fn test_attach_and_list() {
        let (service, _store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut photo: &[u8] = b"jpeg bytes";
        let first = service
            .attach("g1", "item-1", "front.jpg", AttachmentType::Photo, false, &mut photo)
            .await
            .unwrap();
        let mut manual: &[u8] = b"pdf bytes";
        service
            .attach("g1", "item-1", "manual.pdf", AttachmentType::Manual, false, &mut manual)
            .await
            .unwrap();

        assert!(first.is_primary);

        let attachments = service.list_attachments("g1", "item-1").await.unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].id, first.id);

        let (_, document) = service.get_attachment("g1", &first.id).await.unwrap();
        assert_eq!(document.title, "front.jpg");
    }

    #[tokio::test]
    async fn test_attachment_is_group_scoped() {
        let (service, _store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut content: &[u8] = b"x";
        let attachment = service
            .attach("g1", "item-1", "a.txt", AttachmentType::Attachment, false, &mut content)
            .await
            .unwrap();

        let result = service.get_attachment("g2", &attachment.id).await;
        assert!(matches!(result, Err(AppError::AttachmentNotFound(_))));
        let result = service.issue_download_token("g2", &attachment.id).await;
        assert!(matches!(result, Err(AppError::AttachmentNotFound(_))));
        let result = service.delete_attachment("g2", &attachment.id).await;
        assert!(matches!(result, Err(AppError::AttachmentNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_attachments_hides_other_groups() {
        let (service, _store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut content: &[u8] = b"g1 photo";
        let attachment = service
            .attach("g1", "shared-item", "a.jpg", AttachmentType::Photo, false, &mut content)
            .await
            .unwrap();

        assert!(service.list_attachments("g2", "shared-item").await.unwrap().is_empty());

        let listed = service.list_attachments("g1", "shared-item").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, attachment.id);
    }

    #[tokio::test]
    async fn test_update_attachment() {
        let (service, _store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut content: &[u8] = b"x";
        let attachment = service
            .attach("g1", "item-1", "w.pdf", AttachmentType::Attachment, false, &mut content)
            .await
            .unwrap();

        let updated = service
            .update_attachment(
                "g1",
                UpdateAttachmentRequest {
                    id: attachment.id.clone(),
                    attachment_type: Some(AttachmentType::Warranty),
                    is_primary: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.attachment_type, AttachmentType::Warranty);
    }

    #[tokio::test]
    async fn test_delete_attachment_removes_blob() {
        let (service, store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut content: &[u8] = b"receipt";
        let attachment = service
            .attach("g1", "item-1", "receipt.png", AttachmentType::Receipt, false, &mut content)
            .await
            .unwrap();
        let (_, document) = service.get_attachment("g1", &attachment.id).await.unwrap();

        service.delete_attachment("g1", &attachment.id).await.unwrap();

        assert!(service.list_attachments("g1", "item-1").await.unwrap().is_empty());
        assert!(matches!(store.get(&document.path).await, Err(AppError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_download_token_round_trip() {
        let (service, _store, _temp) = create_test_service(Duration::from_secs(60)).await;

        let mut content: &[u8] = b"photo of the drill";
        let attachment = service
            .attach("g1", "drill", "drill.jpg", AttachmentType::Photo, true, &mut content)
            .await
            .unwrap();

        let token = service.issue_download_token("g1", &attachment.id).await.unwrap();
        let (document, reader) = service.open_with_token(&token).await.unwrap();

        assert_eq!(document.title, "drill.jpg");
        assert_eq!(read_all(reader).await, b"photo of the drill");

        // Tokens stay valid until they expire.
        assert!(service.open_with_token(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_or_expired_token() {
        let (service, _store, _temp) = create_test_service(Duration::from_millis(20)).await;

        assert!(matches!(
            service.open_with_token("not-a-token").await,
            Err(AppError::InvalidToken)
        ));

        let mut content: &[u8] = b"x";
        let attachment = service
            .attach("g1", "item-1", "a.txt", AttachmentType::Attachment, false, &mut content)
            .await
            .unwrap();
        let token = service.issue_download_token("g1", &attachment.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(service.open_with_token(&token).await, Err(AppError::InvalidToken)));
        assert!(service.tokens().is_empty().await);
    }
}
