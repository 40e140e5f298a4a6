// Homebox storage daemon
// Entry point and application setup

use anyhow::Context;
use homebox::config::Config;
use homebox::services::MaintenanceScheduler;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("homebox={},info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Homebox storage");

    // Storage is required; there is no degraded mode without it.
    let state = homebox::app::setup(&config)
        .await
        .context("failed to initialize storage")?;

    let scheduler = MaintenanceScheduler::new().await?;
    scheduler
        .schedule_token_purge(state.attachments.tokens())
        .await?;
    scheduler.start().await?;

    tracing::info!("Homebox storage ready at {:?}", config.blob_root());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    scheduler.shutdown().await?;

    Ok(())
}
