//! In-memory blob store
//!
//! Holds blobs in a map inside the process. Keys are stored verbatim and
//! never rewritten; a second `put` to the same key replaces the blob.

use super::blob_store::{BlobReader, BlobStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<BlobReader> {
        let blobs = self.blobs.read().await;
        let data = blobs
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::BlobNotFound(key.to_string()))?;

        Ok(Box::new(Cursor::new(SharedBytes(data))))
    }

    async fn put(&self, key: &str, content: &mut (dyn AsyncRead + Send + Unpin)) -> Result<String> {
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;

        tracing::debug!("Stored in-memory blob: {} ({} bytes)", key, data.len());

        self.blobs
            .write()
            .await
            .insert(key.to_string(), Arc::new(data));

        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::BlobNotFound(key.to_string()))
    }
}

/// Shared view of a stored blob so readers do not copy the bytes
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}
