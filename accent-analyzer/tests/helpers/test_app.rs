//! Fully wired service with a mock model and fast retries

use accent_analyzer::services::{
    AnalysisCache, AnalysisPipeline, AudioNormalizer, CacheStore, ClassificationInvoker,
    MemoryCacheStore, RateLimitPolicy,
};
use accent_analyzer::utils::RetryPolicy;
use accent_analyzer::{build_router, AppState};
use axum::Router;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::mock_model::MockModel;

pub const TEST_API_KEY: &str = "test-key-0123456789abcdef01234567";
pub const TEST_MODEL_ID: &str = "test/accent-model";

/// Same attempt budget as production, millisecond backoff
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(10),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub model: Arc<MockModel>,
    pub store: Arc<MemoryCacheStore>,
    /// Staged downloads land here so tests can check cleanup
    pub staging_dir: TempDir,
}

impl TestApp {
    pub fn new(model: MockModel) -> Self {
        Self::with_options(model, true, 10)
    }

    pub fn with_options(model: MockModel, dedupe_in_flight: bool, rate_limit_per_minute: u32) -> Self {
        let model = Arc::new(model);
        let store = Arc::new(MemoryCacheStore::new());
        let staging_dir = TempDir::new().unwrap();

        let cache = AnalysisCache::new(store.clone());
        let normalizer =
            Arc::new(AudioNormalizer::with_default_client().unwrap().with_staging_dir(staging_dir.path()));
        let invoker = Arc::new(ClassificationInvoker::new(
            model.clone(),
            TEST_MODEL_ID,
            cache.clone(),
            fast_retry_policy(),
        ));
        let pipeline =
            AnalysisPipeline::new(cache, normalizer, invoker).with_in_flight_dedup(dedupe_in_flight);

        let cache_store: Arc<dyn CacheStore> = store.clone();
        let state = AppState::new(
            pipeline,
            cache_store,
            RateLimitPolicy::per_minute(NonZeroU32::new(rate_limit_per_minute).unwrap()),
            TEST_API_KEY,
        );

        Self {
            state,
            model,
            store,
            staging_dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Files left in the staging directory
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path()).unwrap().count()
    }
}
