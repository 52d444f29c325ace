//! Content-addressed result cache
//!
//! Two namespaces share one store:
//! - `accent:<sha256(url)>` holds the enriched response for a request URL
//! - `model:<sha256(pcm)>` holds the validated model output for audio content
//!
//! A URL miss can still skip inference when the same audio was classified
//! under a different URL.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::cache_store::{CacheError, CacheStore};
use crate::models::NormalizedAudio;
use crate::utils::sha256_hex;

/// Fixed lifetime of every cache entry (one hour)
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Logical cache partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Enriched responses keyed by request URL
    Analysis,
    /// Model output keyed by normalized audio content
    Model,
}

impl CacheNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheNamespace::Analysis => "accent",
            CacheNamespace::Model => "model",
        }
    }
}

/// Deterministic `<namespace>:<digest>` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    key: String,
}

impl CacheKey {
    fn new(namespace: CacheNamespace, digest: &str) -> Self {
        Self {
            namespace,
            key: format!("{}:{}", namespace.prefix(), digest),
        }
    }

    /// Key for the enriched response of a canonical request URL
    pub fn for_url(url: &Url) -> Self {
        Self::new(CacheNamespace::Analysis, &sha256_hex(url.as_str().as_bytes()))
    }

    /// Key for model output of normalized audio content
    pub fn for_audio(audio: &NormalizedAudio) -> Self {
        Self::new(CacheNamespace::Model, &sha256_hex(audio.as_bytes()))
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Typed JSON layer over a [`CacheStore`] with the fixed TTL
#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: CACHE_TTL,
        }
    }

    /// Cached value for `key`
    ///
    /// An entry that no longer deserializes is treated as a miss and will be
    /// overwritten by the next write.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Serialize and store `value` under `key` with the fixed TTL
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let raw =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set_ex(key.as_str(), self.ttl, raw).await?;
        tracing::debug!(cache_key = %key, ttl_secs = self.ttl.as_secs(), "Cached value");
        Ok(())
    }
}
