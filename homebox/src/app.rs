//! Application state and initialization
//!
//! This module wires configuration, database, blob storage and services
//! together. All services are made available through AppState.

use crate::config::Config;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{AttachmentsService, DocumentsService};
use crate::storage::{BlobStore, LocalBlobStore};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repo: Repository,
    pub blob_store: Arc<dyn BlobStore>,
    pub documents: DocumentsService,
    pub attachments: AttachmentsService,
}

/// Application setup - called once on startup.
///
/// Any error here means storage is unusable; the caller is expected to abort.
pub async fn setup(config: &Config) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", config.data_dir);

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let pool = create_pool(&config.sqlite_path).await?;
    let repo = Repository::new(pool);

    let blob_store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.blob_root()).await?);

    let documents = DocumentsService::new(repo.clone(), Arc::clone(&blob_store));
    let attachments = AttachmentsService::new(repo.clone(), documents.clone(), config.attachment_token_ttl);

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        config: config.clone(),
        repo,
        blob_store,
        documents,
        attachments,
    })
}
