//! Key-value cache store with expiry
//!
//! The pipeline talks to the store through [`CacheStore`] so the backing
//! engine can be swapped. [`MemoryCacheStore`] is the in-process engine;
//! [`RestCacheStore`](super::RestCacheStore) reaches a shared one over HTTP.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Generic get / setex store
///
/// Implementations must be safe for concurrent use; a write for an existing
/// key replaces the whole entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value for `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError>;

    /// Connectivity probe for health reporting
    async fn ping(&self) -> Result<(), CacheError>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache engine
///
/// Expired entries are evicted lazily on read and by [`purge_expired`].
///
/// [`purge_expired`]: MemoryCacheStore::purge_expired
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: evict unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            tracing::trace!(key, "Evicted expired cache entry");
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Connection(format!("TTL {:?} out of range", ttl)))?;

        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
