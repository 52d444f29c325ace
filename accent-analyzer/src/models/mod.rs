//! Data models for accent analysis

pub mod accent;
pub mod analysis;
pub mod audio;

pub use accent::{
    Accent, ClassificationResult, ConfidenceBand, PredictionError, RawPrediction,
    SUPPORTED_ACCENTS,
};
pub use analysis::{
    AnalysisRequest, AnalysisResponse, AnalysisSource, AudioRequest, ConfidenceLegend,
    EnrichedResult, ModelDetails, RequestValidationError,
};
pub use audio::{NormalizedAudio, TARGET_SAMPLE_RATE};
