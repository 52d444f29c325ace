//! Classification invoker
//!
//! Wraps the remote model with the content-hash cache, bounded retry, and
//! validation against the accent vocabulary.

use std::sync::Arc;
use thiserror::Error;

use super::analysis_cache::{AnalysisCache, CacheKey};
use super::cache_store::CacheError;
use super::inference_client::{AccentModel, ModelError};
use crate::models::{Accent, ClassificationResult, NormalizedAudio, PredictionError};
use crate::utils::{retry_with_backoff, RetryPolicy};

/// Invoker errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Model answered with a label outside the vocabulary
    #[error("Unsupported accent type '{label}'. Supported English accents: {supported}")]
    UnsupportedAccent { label: String, supported: String },

    /// Retries exhausted or a non-transient model failure
    #[error("Model inference failed after {attempts} attempt(s)")]
    InferenceFailed {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// Model answered with an unusable confidence value
    #[error("Malformed model result: {0}")]
    MalformedResult(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Classification outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub result: ClassificationResult,
    /// True when answered from the content-hash cache
    pub cached: bool,
}

pub struct ClassificationInvoker {
    model: Arc<dyn AccentModel>,
    model_id: String,
    cache: AnalysisCache,
    retry_policy: RetryPolicy,
}

impl ClassificationInvoker {
    pub fn new(
        model: Arc<dyn AccentModel>,
        model_id: impl Into<String>,
        cache: AnalysisCache,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            cache,
            retry_policy,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Classify normalized audio
    ///
    /// **Algorithm:**
    /// 1. Look up `model:<sha256(pcm)>`; a hit returns without a remote call
    /// 2. Call the model, retrying transient failures per the retry policy
    /// 3. Validate label and confidence
    /// 4. Store the validated result under the content key
    pub async fn classify(&self, audio: &NormalizedAudio) -> Result<Classification, ClassifyError> {
        let key = CacheKey::for_audio(audio);

        if let Some(result) = self.cache.get::<ClassificationResult>(&key).await? {
            tracing::debug!(cache_key = %key, accent = %result.accent, "Content cache hit");
            return Ok(Classification {
                result,
                cached: true,
            });
        }

        let raw = retry_with_backoff(
            "model inference",
            &self.retry_policy,
            ModelError::is_transient,
            || self.model.classify(audio.as_bytes(), &self.model_id),
        )
        .await
        .map_err(|e| {
            if e.exhausted {
                tracing::error!(attempts = e.attempts, error = %e.last_error, "Model unavailable, retries exhausted");
            } else {
                tracing::warn!(attempts = e.attempts, error = %e.last_error, "Model rejected request");
            }
            ClassifyError::InferenceFailed {
                attempts: e.attempts,
                source: e.last_error,
            }
        })?;

        let result = ClassificationResult::from_prediction(&raw).map_err(|e| match e {
            PredictionError::UnsupportedAccent(label) => {
                tracing::warn!(label = %label, "Model returned unsupported accent");
                ClassifyError::UnsupportedAccent {
                    label,
                    supported: Accent::supported_list(),
                }
            }
            other @ PredictionError::ConfidenceOutOfRange(_) => {
                ClassifyError::MalformedResult(other.to_string())
            }
        })?;

        self.cache.put(&key, &result).await?;

        Ok(Classification {
            result,
            cached: false,
        })
    }
}
