//! Database module
//!
//! SQLite storage for document and attachment records:
//! - `schema`: embedded migrations
//! - `models`: row types and request structs
//! - `repository`: queries

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;

/// Per-connection settings. Every pooled connection gets WAL, enforced
/// foreign keys and a busy timeout from here.
fn connect_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
}

/// Open the database file and bring its schema up to date
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening database at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(connect_options(db_path))
        .await?;

    initialize_database(&pool).await?;

    Ok(pool)
}
