//! Blob store contract
//!
//! A blob is an opaque byte stream stored under a string key. Backends decide
//! what a key means physically; callers only ever hold on to the key returned
//! by `put`.

use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Readable stream over a stored blob. Dropping it releases the underlying handle.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open the blob stored under `key`.
    ///
    /// Fails with `AppError::BlobNotFound` when nothing is stored there.
    async fn get(&self, key: &str) -> Result<BlobReader>;

    /// Persist everything read from `content` under `key`.
    ///
    /// Returns the key to use for all later access. Backends may rewrite it,
    /// so callers must store the returned value rather than `key`. A failed
    /// write is not rolled back.
    async fn put(&self, key: &str, content: &mut (dyn AsyncRead + Send + Unpin)) -> Result<String>;

    /// Remove the blob stored under `key`.
    ///
    /// Fails with `AppError::BlobNotFound` when nothing is stored there.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Read a whole blob into memory
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let mut reader = self.get(key).await?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(data)
    }

    /// Store an in-memory buffer
    async fn put_bytes(&self, key: &str, data: &[u8]) -> Result<String> {
        let mut reader = data;
        self.put(key, &mut reader).await
    }
}
