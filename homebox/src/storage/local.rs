//! Local filesystem blob store
//!
//! Keys are paths relative to a root directory, e.g. "<group>/documents/<file>".
//! Older deployments persisted absolute keys that already include the root;
//! those are served as-is so no data migration is needed. Either way a key
//! must name a file strictly below the root.

use super::blob_store::{BlobReader, BlobStore};
use super::unique_path::{unique_path, DirLister, FsDirLister};
use crate::config::PUT_CREATE_RETRIES;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Blob store rooted at a directory on the local disk
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    /// `root` rendered once for legacy key detection
    root_prefix: String,
    lister: Arc<dyn DirLister>,
}

impl LocalBlobStore {
    /// Open a store at `root`, creating the directory tree if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_dir_lister(root, Arc::new(FsDirLister)).await
    }

    /// Open a store that scans directories through `lister` during collision avoidance
    pub async fn with_dir_lister(root: impl Into<PathBuf>, lister: Arc<dyn DirLister>) -> Result<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await?;
        tracing::info!("Blob store initialized at: {:?}", root);

        let root_prefix = root.to_string_lossy().into_owned();

        Ok(Self {
            root,
            root_prefix,
            lister,
        })
    }

    /// Map a key to its location on disk.
    ///
    /// A key that already starts with the root is a legacy absolute key and is
    /// used untouched. Anything else is joined onto the root, so a relative key
    /// that happens to begin with the root's text is misread. Keys that name
    /// the root itself or step out of it with `..` are rejected.
    pub fn resolve_path(&self, key: &str) -> Result<PathBuf> {
        let path = if !self.root_prefix.is_empty() && key.starts_with(&self.root_prefix) {
            PathBuf::from(key)
        } else {
            let relative = key.trim_start_matches(|c: char| c == '/' || c == MAIN_SEPARATOR);
            self.root.join(relative)
        };

        let inside_root = path.strip_prefix(&self.root).is_ok_and(|relative| {
            !relative.as_os_str().is_empty()
                && relative.components().all(|c| matches!(c, Component::Normal(_)))
        });
        if !inside_root {
            return Err(AppError::Validation(format!(
                "Blob key {:?} does not name a file under the store root",
                key
            )));
        }

        Ok(path)
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Claim a free file for `requested`, rescanning if another writer wins the race
    async fn create_unique(&self, requested: &Path) -> Result<(PathBuf, fs::File)> {
        for _ in 0..PUT_CREATE_RETRIES {
            let target = self.pick_unique(requested).await?;

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(file) => return Ok((target, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!("{:?} was claimed concurrently, rescanning", target);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::BlobStore(format!(
            "Could not claim a file name for {:?} after {} attempts",
            requested, PUT_CREATE_RETRIES
        )))
    }

    /// Run the directory scan on the blocking pool; listers may do sync I/O.
    async fn pick_unique(&self, requested: &Path) -> Result<PathBuf> {
        let lister = Arc::clone(&self.lister);
        let requested = requested.to_path_buf();

        tokio::task::spawn_blocking(move || unique_path(&requested, lister.as_ref()))
            .await
            .map_err(|e| AppError::BlobStore(format!("Directory scan failed: {}", e)))?
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, key: &str) -> Result<BlobReader> {
        let path = self.resolve_path(key)?;

        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;

        tracing::debug!("Opened blob: {}", key);

        Ok(Box::new(file))
    }

    async fn put(&self, key: &str, content: &mut (dyn AsyncRead + Send + Unpin)) -> Result<String> {
        let requested = self.resolve_path(key)?;
        let (path, mut file) = self.create_unique(&requested).await?;

        let written = tokio::io::copy(content, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!("Wrote blob: {} -> {:?} ({} bytes)", key, path, written);

        // The caller keeps addressing the blob by the key it asked for.
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve_path(key)?;

        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;

        tracing::debug!("Deleted blob: {}", key);

        Ok(())
    }
}

fn not_found_or_io(err: io::Error, key: &str) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::BlobNotFound(key.to_string())
    } else {
        AppError::Io(err)
    }
}
