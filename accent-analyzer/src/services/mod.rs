//! Services for accent analysis

pub mod analysis_cache;
pub mod analysis_pipeline;
pub mod audio_normalizer;
pub mod cache_store;
pub mod classification_invoker;
pub mod in_flight;
pub mod inference_client;
pub mod rate_limiter;
pub mod rest_cache_store;

pub use analysis_cache::{AnalysisCache, CacheKey, CacheNamespace, CACHE_TTL};
pub use analysis_pipeline::{AnalysisPipeline, PipelineStage};
pub use audio_normalizer::{AudioNormalizer, NormalizeError};
pub use cache_store::{CacheError, CacheStore, MemoryCacheStore};
pub use classification_invoker::{Classification, ClassificationInvoker, ClassifyError};
pub use in_flight::{InFlightGuard, InFlightRequests};
pub use inference_client::{
    AccentModel, HuggingFaceClient, ModelError, DEFAULT_INFERENCE_URL, DEFAULT_MODEL_ID,
};
pub use rate_limiter::{CallerRateLimiter, RateLimitExceeded, RateLimitPolicy};
pub use rest_cache_store::RestCacheStore;
