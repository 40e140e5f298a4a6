//! Maintenance Scheduler
//!
//! Runs periodic housekeeping jobs using cron expressions.
//! Currently purges expired attachment download tokens.

use crate::config::TOKEN_PURGE_CRON;
use crate::error::{AppError, Result};
use crate::services::TokenCache;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Scheduler service for background maintenance
pub struct MaintenanceScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    purge_job_id: Arc<RwLock<Option<Uuid>>>,
}

impl MaintenanceScheduler {
    /// Create new scheduler service
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            purge_job_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Schedule the expired-token purge, replacing any earlier schedule
    pub async fn schedule_token_purge<V>(&self, tokens: TokenCache<V>) -> Result<()>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.cancel_token_purge().await?;

        let job = Job::new_async(TOKEN_PURGE_CRON.to_string(), move |_uuid, _l| {
            let tokens = tokens.clone();
            Box::pin(async move {
                let purged = tokens.purge_expired().await;
                if purged > 0 {
                    tracing::debug!("Purged {} expired attachment tokens", purged);
                }
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create purge job: {}", e)))?;

        let job_id = job.guid();

        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        *self.purge_job_id.write().await = Some(job_id);

        tracing::info!("Token purge scheduled ({})", TOKEN_PURGE_CRON);
        Ok(())
    }

    /// Cancel the scheduled token purge
    pub async fn cancel_token_purge(&self) -> Result<()> {
        let mut current_job = self.purge_job_id.write().await;

        if let Some(job_id) = *current_job {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&job_id)
                .await
                .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))?;

            *current_job = None;
            tracing::info!("Token purge schedule cancelled");
        }

        Ok(())
    }

    /// Whether a purge job is currently registered
    pub async fn has_token_purge(&self) -> bool {
        self.purge_job_id.read().await.is_some()
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Maintenance scheduler shutdown");
        Ok(())
    }
}
