//! Expiring token cache
//!
//! Short-lived tokens that let a client download an attachment without
//! sending its session credentials (e.g. from an `<img src>` link). Only the
//! SHA-256 of each raw token is kept in memory.

use crate::config::ATTACHMENT_TOKEN_BYTES;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory map from hashed token to value, with per-entry expiry
#[derive(Clone)]
pub struct TokenCache<V> {
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
}

impl<V: Clone> Default for TokenCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TokenCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store `value` under `raw_token` until `ttl` elapses
    pub async fn insert(&self, raw_token: &str, value: V, ttl: Duration) {
        self.insert_until(raw_token, value, Instant::now() + ttl).await;
    }

    /// Look up a live token. Expired entries are evicted on the way.
    pub async fn get(&self, raw_token: &str) -> Option<V> {
        self.get_at(raw_token, Instant::now()).await
    }

    /// Revoke a token
    pub async fn remove(&self, raw_token: &str) -> Option<V> {
        self.entries
            .write()
            .await
            .remove(&hash_token(raw_token))
            .map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.purge_at(Instant::now()).await
    }

    /// Number of entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn insert_until(&self, raw_token: &str, value: V, expires_at: Instant) {
        self.entries
            .write()
            .await
            .insert(hash_token(raw_token), Entry { value, expires_at });
    }

    async fn get_at(&self, raw_token: &str, now: Instant) -> Option<V> {
        let hash = hash_token(raw_token);

        {
            let entries = self.entries.read().await;
            match entries.get(&hash) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&hash).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(&hash);
        }
        None
    }

    async fn purge_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

/// Generate a random raw token, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; ATTACHMENT_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a raw token, hex encoded
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}
