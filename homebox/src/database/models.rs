//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization in API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// A stored file owned by a group
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub group_id: String,
    pub title: String,
    /// Blob key returned by the blob store
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role a document plays for an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttachmentType {
    Photo,
    Manual,
    Warranty,
    #[default]
    Attachment,
    Receipt,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Photo => "photo",
            AttachmentType::Manual => "manual",
            AttachmentType::Warranty => "warranty",
            AttachmentType::Attachment => "attachment",
            AttachmentType::Receipt => "receipt",
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "photo" => Ok(AttachmentType::Photo),
            "manual" => Ok(AttachmentType::Manual),
            "warranty" => Ok(AttachmentType::Warranty),
            "attachment" => Ok(AttachmentType::Attachment),
            "receipt" => Ok(AttachmentType::Receipt),
            other => Err(format!("Unknown attachment type: {}", other)),
        }
    }
}

/// Link between an item and a document
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: String,
    pub item_id: String,
    pub document_id: String,
    pub attachment_type: AttachmentType,
    /// At most one attachment per item is primary
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create attachment request
#[derive(Debug, Deserialize)]
pub struct CreateAttachmentRequest {
    pub item_id: String,
    pub document_id: String,
    pub attachment_type: AttachmentType,
    pub is_primary: bool,
}

/// Update attachment request
#[derive(Debug, Deserialize)]
pub struct UpdateAttachmentRequest {
    pub id: String,
    pub attachment_type: Option<AttachmentType>,
    pub is_primary: Option<bool>,
}
