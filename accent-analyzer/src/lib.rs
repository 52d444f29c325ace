//! accent-analyzer library interface
//!
//! Exposes the pipeline, services and router for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{AnalysisError, ApiResult, ErrorKind};

use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::services::{
    AnalysisCache, AnalysisPipeline, AudioNormalizer, CacheStore, CallerRateLimiter,
    ClassificationInvoker, HuggingFaceClient, MemoryCacheStore, RateLimitPolicy,
};
use crate::utils::RetryPolicy;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    /// Same store the pipeline caches into; pinged by /health
    pub cache_store: Arc<dyn CacheStore>,
    pub rate_limiter: Arc<CallerRateLimiter>,
    /// Expected `X-API-Key` value
    pub api_key: Arc<str>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        pipeline: AnalysisPipeline,
        cache_store: Arc<dyn CacheStore>,
        rate_limit: RateLimitPolicy,
        api_key: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache_store,
            rate_limiter: Arc::new(CallerRateLimiter::new(rate_limit)),
            api_key: api_key.into(),
            startup_time: Utc::now(),
        }
    }

    /// Wire production clients from resolved settings
    pub fn from_settings(settings: &Settings, cache_store: Arc<dyn CacheStore>) -> anyhow::Result<Self> {
        let cache = AnalysisCache::new(cache_store.clone());
        let normalizer = Arc::new(AudioNormalizer::with_default_client()?);
        let model = Arc::new(HuggingFaceClient::new(
            settings.inference_url.as_str(),
            settings.model_token.as_str(),
        )?);
        let invoker = Arc::new(ClassificationInvoker::new(
            model,
            settings.model_id.as_str(),
            cache.clone(),
            RetryPolicy::default(),
        ));
        let pipeline = AnalysisPipeline::new(cache, normalizer, invoker)
            .with_in_flight_dedup(settings.dedupe_in_flight);

        Ok(Self::new(
            pipeline,
            cache_store,
            RateLimitPolicy::per_minute(settings.rate_limit_per_minute),
            settings.api_key.as_str(),
        ))
    }
}

/// Build application router
///
/// `/api/v1/analyze` sits behind the API key middleware; `/health` is public.
pub fn build_router(state: AppState) -> Router {
    let protected = api::analyze_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::require_api_key,
    ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically drop idle rate-limit buckets and, for the in-process cache,
/// expired entries
pub fn spawn_maintenance(
    store: Option<Arc<MemoryCacheStore>>,
    rate_limiter: Arc<CallerRateLimiter>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            rate_limiter.purge_idle();
            if let Some(store) = &store {
                let purged = store.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries");
                }
            }
        }
    })
}
