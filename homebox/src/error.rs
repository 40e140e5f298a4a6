//! Error types for Homebox storage
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for API responses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Invalid or expired attachment token")]
    InvalidToken,

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// True for the not-found family (mapped to 404 at the HTTP boundary)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::BlobNotFound(_)
                | AppError::DocumentNotFound(_)
                | AppError::AttachmentNotFound(_)
        )
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
