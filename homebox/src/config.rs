//! Application configuration
//!
//! Constants for resource limits plus the runtime `Config`, layered from
//! built-in defaults and `HBOX_*` environment variables.

use crate::error::{AppError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ===== Blob Storage =====

/// Number of file names tried by collision avoidance, counting the requested
/// name itself. Suffixes run from " (1)" to " (999)".
pub const MAX_UNIQUE_PATH_CANDIDATES: u32 = 1000;

/// How many times `put` rescans the directory when another writer claims the
/// chosen name between the scan and the create.
pub const PUT_CREATE_RETRIES: u32 = 8;

/// Subdirectory of the data directory holding blobs
pub const BLOB_DIR_NAME: &str = "blobs";

// ===== Documents =====

/// Maximum length of a document title, in characters
pub const MAX_TITLE_LENGTH: usize = 255;

// ===== Attachment Tokens =====

/// Default lifetime of an attachment download token
pub const DEFAULT_ATTACHMENT_TOKEN_TTL_SECS: u64 = 60;

/// Random bytes in a raw download token (rendered as 64 hex characters)
pub const ATTACHMENT_TOKEN_BYTES: usize = 32;

/// Expired tokens are purged at the top of every minute
pub const TOKEN_PURGE_CRON: &str = "0 * * * * *";

// ===== Environment =====

/// Prefix of every environment variable read by `Config`
const ENV_PREFIX: &str = "HBOX";

const DEFAULT_DATA_DIR: &str = "./.data";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Raw settings as read from `HBOX_*` variables
#[derive(Debug, Deserialize)]
struct Settings {
    storage_data: PathBuf,
    #[serde(default)]
    storage_sqlite_path: Option<PathBuf>,
    attachment_token_ttl: u64,
    log_level: String,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all persisted state
    pub data_dir: PathBuf,
    /// SQLite database file
    pub sqlite_path: PathBuf,
    pub attachment_token_ttl: Duration,
    pub log_level: String,
}

impl Config {
    /// Load configuration from process environment
    pub fn from_env() -> Result<Self> {
        Self::load(environment())
    }

    /// Load configuration from explicit `HBOX_*` variables instead of the
    /// process environment
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: ::config::Map<String, String> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::load(environment().source(Some(vars)))
    }

    fn load(env: ::config::Environment) -> Result<Self> {
        let settings: Settings = ::config::Config::builder()
            .set_default("storage_data", DEFAULT_DATA_DIR)
            .and_then(|b| b.set_default("attachment_token_ttl", DEFAULT_ATTACHMENT_TOKEN_TTL_SECS as i64))
            .and_then(|b| b.set_default("log_level", DEFAULT_LOG_LEVEL))
            .map_err(|e| AppError::Config(e.to_string()))?
            .add_source(env)
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if settings.attachment_token_ttl == 0 {
            return Err(AppError::Config(format!(
                "{}_ATTACHMENT_TOKEN_TTL must be greater than 0",
                ENV_PREFIX
            )));
        }

        let sqlite_path = settings
            .storage_sqlite_path
            .unwrap_or_else(|| settings.storage_data.join("homebox.db"));

        Ok(Self {
            data_dir: settings.storage_data,
            sqlite_path,
            attachment_token_ttl: Duration::from_secs(settings.attachment_token_ttl),
            log_level: settings.log_level,
        })
    }

    /// Root directory handed to the local blob store
    pub fn blob_root(&self) -> PathBuf {
        self.data_dir.join(BLOB_DIR_NAME)
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX).ignore_empty(true)
}
