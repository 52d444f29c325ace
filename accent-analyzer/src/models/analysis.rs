//! Analysis request and response models

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::accent::{Accent, ClassificationResult, ConfidenceBand, SUPPORTED_ACCENTS};

/// Audio file extensions accepted in request URLs
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "ogg"];

/// Only language currently analyzed
pub const ENGLISH: &str = "en";

fn default_language() -> String {
    ENGLISH.to_string()
}

/// POST /api/v1/analyze request body (unvalidated)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisRequest {
    /// Audio file URL
    pub url: String,
    /// Optional caller token, accepted for compatibility and not forwarded
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Language code (only "en" supported)
    #[serde(default = "default_language")]
    pub language: String,
}

/// Request rejections raised before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    #[error("Invalid audio URL format: {0}")]
    InvalidUrlFormat(String),

    #[error("Invalid URL scheme: {0}")]
    BadScheme(String),

    #[error("Only English language analysis is currently supported (got '{0}')")]
    UnsupportedLanguage(String),
}

/// Validated analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRequest {
    url: Url,
}

impl AudioRequest {
    /// Validate URL shape, scheme, extension and language
    ///
    /// Scheme is checked before extension so `ftp://host/file` reports a bad
    /// scheme rather than a format problem.
    pub fn validate(request: AnalysisRequest) -> Result<Self, RequestValidationError> {
        let url = Url::parse(request.url.trim())
            .map_err(|e| RequestValidationError::InvalidUrlFormat(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestValidationError::BadScheme(url.scheme().to_string()));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(RequestValidationError::InvalidUrlFormat(
                "URL has no host".to_string(),
            ));
        }

        if audio_extension(&url).is_none() {
            return Err(RequestValidationError::InvalidUrlFormat(format!(
                "path must end in one of: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        if !request.language.eq_ignore_ascii_case(ENGLISH) {
            return Err(RequestValidationError::UnsupportedLanguage(request.language));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Supported audio extension of the last path segment, lowercased
pub fn audio_extension(url: &Url) -> Option<String> {
    let last_segment = url.path_segments()?.last()?;
    let (stem, extension) = last_segment.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let extension = extension.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Where a response was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Fresh,
    Cache,
}

/// Model provenance attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    pub model_id: String,
    /// True when the content-hash cache answered instead of the remote model
    pub cached: bool,
}

/// Human-readable legend for confidence bands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceLegend {
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl Default for ConfidenceLegend {
    fn default() -> Self {
        Self {
            high: "≥80%".to_string(),
            medium: "50-79%".to_string(),
            low: "<50%".to_string(),
        }
    }
}

/// Classification plus summary and static metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub accent: Accent,
    pub confidence: f64,
    pub summary: String,
    pub confidence_band: ConfidenceBand,
    pub details: ModelDetails,
    pub language: String,
    pub accent_types: Vec<Accent>,
    pub confidence_interpretation: ConfidenceLegend,
}

impl EnrichedResult {
    pub fn new(result: &ClassificationResult, details: ModelDetails) -> Self {
        Self {
            accent: result.accent,
            confidence: result.confidence,
            summary: format!(
                "This audio has {}% confidence of being {} English",
                format_confidence(result.confidence),
                result.accent
            ),
            confidence_band: result.band(),
            details,
            language: ENGLISH.to_string(),
            accent_types: SUPPORTED_ACCENTS.to_vec(),
            confidence_interpretation: ConfidenceLegend::default(),
        }
    }
}

/// Shortest decimal form, but always with a fractional digit ("64.0", "91.25")
fn format_confidence(confidence: f64) -> String {
    if confidence.is_finite() && confidence.fract() == 0.0 {
        format!("{:.1}", confidence)
    } else {
        confidence.to_string()
    }
}

/// POST /api/v1/analyze response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub result: EnrichedResult,
    pub source: AnalysisSource,
}
