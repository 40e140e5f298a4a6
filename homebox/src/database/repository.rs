//! Repository layer for database operations
//!
//! CRUD for document and attachment records. Documents are always looked up
//! within a group; a document owned by another group reads as not found.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a document record pointing at an already stored blob
    pub async fn create_document(&self, group_id: &str, title: &str, path: &str) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, group_id, title, path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(group_id)
        .bind(title)
        .bind(path)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created document: {} in group: {}", id, group_id);
        Ok(document)
    }

    /// Get a document by ID within a group
    pub async fn get_document(&self, group_id: &str, id: &str) -> Result<Document> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ? AND group_id = ?")
            .bind(id)
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound(id.to_string()))
    }

    /// List a group's documents, newest first
    pub async fn list_documents(&self, group_id: &str) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE group_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Change a document's title
    pub async fn rename_document(&self, group_id: &str, id: &str, title: &str) -> Result<Document> {
        sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents SET title = ?, updated_at = ?
            WHERE id = ? AND group_id = ?
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(Utc::now())
        .bind(id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound(id.to_string()))
    }

    /// Delete a document record, returning it so the caller can drop its blob.
    /// Attachments pointing at it go with it.
    pub async fn delete_document(&self, group_id: &str, id: &str) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(
            "DELETE FROM documents WHERE id = ? AND group_id = ? RETURNING *",
        )
        .bind(id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound(id.to_string()))?;

        tracing::debug!("Deleted document: {}", id);
        Ok(document)
    }

    /// Create an attachment.
    ///
    /// The first photo of an item becomes its primary attachment. Marking an
    /// attachment primary clears the flag on the item's other attachments.
    pub async fn create_attachment(&self, req: CreateAttachmentRequest) -> Result<Attachment> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let mut is_primary = req.is_primary;
        if !is_primary && req.attachment_type == AttachmentType::Photo {
            let has_primary: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM attachments WHERE item_id = ? AND is_primary = 1",
            )
            .bind(&req.item_id)
            .fetch_one(&mut *tx)
            .await?;
            is_primary = has_primary == 0;
        }

        if is_primary {
            clear_primary(&mut tx, &req.item_id).await?;
        }

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (id, item_id, document_id, attachment_type, is_primary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.item_id)
        .bind(&req.document_id)
        .bind(req.attachment_type)
        .bind(is_primary)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Created attachment: {} for item: {}", id, req.item_id);
        Ok(attachment)
    }

    /// Get an attachment by ID
    pub async fn get_attachment(&self, id: &str) -> Result<Attachment> {
        sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::AttachmentNotFound(id.to_string()))
    }

    /// List a group's attachments for an item, primary first
    pub async fn list_attachments(&self, group_id: &str, item_id: &str) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT attachments.* FROM attachments
            JOIN documents ON documents.id = attachments.document_id
            WHERE attachments.item_id = ? AND documents.group_id = ?
            ORDER BY attachments.is_primary DESC, attachments.created_at ASC
            "#,
        )
        .bind(item_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    /// Update an attachment's type or primary flag
    pub async fn update_attachment(&self, req: UpdateAttachmentRequest) -> Result<Attachment> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(&req.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::AttachmentNotFound(req.id.clone()))?;

        let attachment_type = req.attachment_type.unwrap_or(current.attachment_type);
        let is_primary = req.is_primary.unwrap_or(current.is_primary);

        if is_primary && !current.is_primary {
            clear_primary(&mut tx, &current.item_id).await?;
        }

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            UPDATE attachments SET attachment_type = ?, is_primary = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(attachment_type)
        .bind(is_primary)
        .bind(Utc::now())
        .bind(&req.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Updated attachment: {}", req.id);
        Ok(attachment)
    }
}

async fn clear_primary(tx: &mut Transaction<'_, Sqlite>, item_id: &str) -> Result<()> {
    sqlx::query("UPDATE attachments SET is_primary = 0 WHERE item_id = ? AND is_primary = 1")
        .bind(item_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
