//! Analysis pipeline orchestrator
//!
//! **Stages:**
//! ```text
//! RECEIVED -> URL_CACHE_CHECK -> HIT  -> RESPOND
//!                             -> MISS -> NORMALIZE -> CLASSIFY -> ENRICH -> URL_CACHE_WRITE -> RESPOND
//! ```
//! Any stage failure short-circuits to FAILED.

use std::fmt;
use std::sync::Arc;

use super::analysis_cache::{AnalysisCache, CacheKey};
use super::audio_normalizer::AudioNormalizer;
use super::classification_invoker::ClassificationInvoker;
use super::in_flight::{InFlightGuard, InFlightRequests};
use crate::error::AnalysisError;
use crate::models::{AnalysisResponse, AnalysisSource, AudioRequest, EnrichedResult, ModelDetails};

/// Pipeline stage, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    UrlCacheCheck,
    Normalize,
    Classify,
    Enrich,
    UrlCacheWrite,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::UrlCacheCheck => "url_cache_check",
            PipelineStage::Normalize => "normalize",
            PipelineStage::Classify => "classify",
            PipelineStage::Enrich => "enrich",
            PipelineStage::UrlCacheWrite => "url_cache_write",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates cache, normalizer and invoker for one validated request
pub struct AnalysisPipeline {
    cache: AnalysisCache,
    normalizer: Arc<AudioNormalizer>,
    invoker: Arc<ClassificationInvoker>,
    /// Per-URL coalescing; `None` lets concurrent identical misses run independently
    in_flight: Option<InFlightRequests>,
}

impl AnalysisPipeline {
    pub fn new(
        cache: AnalysisCache,
        normalizer: Arc<AudioNormalizer>,
        invoker: Arc<ClassificationInvoker>,
    ) -> Self {
        Self {
            cache,
            normalizer,
            invoker,
            in_flight: Some(InFlightRequests::new()),
        }
    }

    /// Enable or disable per-URL coalescing of concurrent misses
    pub fn with_in_flight_dedup(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlightRequests::new);
        self
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Run the pipeline for a validated request
    pub async fn analyze(&self, request: &AudioRequest) -> Result<AnalysisResponse, AnalysisError> {
        let url = request.url();
        let url_key = CacheKey::for_url(url);

        if let Some(response) = self.cached_response(&url_key).await? {
            return Ok(response);
        }

        let _guard: Option<InFlightGuard> = match &self.in_flight {
            Some(in_flight) => {
                let guard = in_flight.acquire(url_key.as_str()).await;
                // Another request may have filled the cache while we waited
                if let Some(response) = self.cached_response(&url_key).await? {
                    return Ok(response);
                }
                Some(guard)
            }
            None => None,
        };

        tracing::debug!(stage = %PipelineStage::Normalize, url = %url, "URL cache miss");
        let audio = self.normalizer.normalize(url).await.map_err(|e| {
            let err = AnalysisError::from(e);
            log_stage_failure(PipelineStage::Normalize, &err);
            err
        })?;

        tracing::debug!(stage = %PipelineStage::Classify, samples = audio.sample_count());
        let classification = self.invoker.classify(&audio).await.map_err(|e| {
            let err = AnalysisError::from(e);
            log_stage_failure(PipelineStage::Classify, &err);
            err
        })?;

        tracing::debug!(stage = %PipelineStage::Enrich, accent = %classification.result.accent);
        let enriched = EnrichedResult::new(
            &classification.result,
            ModelDetails {
                model_id: self.invoker.model_id().to_string(),
                cached: classification.cached,
            },
        );

        tracing::debug!(stage = %PipelineStage::UrlCacheWrite, cache_key = %url_key);
        self.cache.put(&url_key, &enriched).await.map_err(|e| {
            let err = AnalysisError::from(e);
            log_stage_failure(PipelineStage::UrlCacheWrite, &err);
            err
        })?;

        tracing::info!(
            url = %url,
            accent = %enriched.accent,
            confidence = enriched.confidence,
            model_cached = classification.cached,
            "Analysis complete"
        );

        Ok(AnalysisResponse {
            result: enriched,
            source: AnalysisSource::Fresh,
        })
    }

    async fn cached_response(&self, url_key: &CacheKey) -> Result<Option<AnalysisResponse>, AnalysisError> {
        let cached = self
            .cache
            .get::<EnrichedResult>(url_key)
            .await
            .map_err(|e| {
                let err = AnalysisError::from(e);
                log_stage_failure(PipelineStage::UrlCacheCheck, &err);
                err
            })?;

        Ok(cached.map(|result| {
            tracing::info!(stage = %PipelineStage::UrlCacheCheck, cache_key = %url_key, "URL cache hit");
            AnalysisResponse {
                result,
                source: AnalysisSource::Cache,
            }
        }))
    }
}

fn log_stage_failure(stage: PipelineStage, err: &AnalysisError) {
    if err.is_client_error() {
        tracing::warn!(stage = %stage, error = %err, "Analysis rejected");
    } else {
        tracing::error!(stage = %stage, error = %err.cause_chain(), "Analysis stage failed");
    }
}
