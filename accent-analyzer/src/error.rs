//! Error types for accent-analyzer
//!
//! Every failure carries a tagged [`ErrorKind`]; the HTTP status follows from
//! the concrete variant. Client errors keep their specific message, internal
//! failures are reported as a generic "Analysis failed".

use accent_common::auth::ApiKeyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error as _;
use thiserror::Error;

use crate::models::RequestValidationError;
use crate::services::{CacheError, ClassifyError, ModelError, NormalizeError, RateLimitExceeded};

/// Message shown to clients for internal failures
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed";

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied an unusable request or the audio/model answer is outside what we support
    Validation,
    Auth,
    RateLimit,
    /// Worth retrying (network errors, remote 5xx/429)
    Transient,
    /// Retries exhausted or failure that retrying cannot fix
    Terminal,
    /// Cache store unreachable
    Cache,
}

/// Analysis error
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed URL, bad scheme, unsupported extension or language
    #[error(transparent)]
    InvalidRequest(#[from] RequestValidationError),

    /// Audio host answered with something that is not audio (422)
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Model label outside the accent vocabulary (400)
    #[error("Unsupported accent type '{label}'. Supported English accents: {supported}")]
    UnsupportedAccent { label: String, supported: String },

    /// Missing or wrong API key (401)
    #[error(transparent)]
    Unauthorized(#[from] ApiKeyError),

    /// Caller exceeded its request allowance (429)
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// Fetch or decode failure (500)
    #[error("Audio processing failed")]
    AudioProcessing(#[source] anyhow::Error),

    /// Remote model failed permanently (500)
    #[error("Model inference failed after {attempts} attempt(s)")]
    InferenceFailed {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// Unusable model output (500)
    #[error("Malformed model result: {0}")]
    MalformedResult(String),

    /// Cache store unavailable (503)
    #[error("Cache unavailable")]
    Cache(#[from] CacheError),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidRequest(_)
            | AnalysisError::UnsupportedContent(_)
            | AnalysisError::UnsupportedAccent { .. } => ErrorKind::Validation,
            AnalysisError::Unauthorized(_) => ErrorKind::Auth,
            AnalysisError::RateLimited(_) => ErrorKind::RateLimit,
            AnalysisError::AudioProcessing(_)
            | AnalysisError::InferenceFailed { .. }
            | AnalysisError::MalformedResult(_) => ErrorKind::Terminal,
            AnalysisError::Cache(_) => ErrorKind::Cache,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::InvalidRequest(RequestValidationError::BadScheme(_)) => {
                StatusCode::BAD_REQUEST
            }
            AnalysisError::InvalidRequest(_) | AnalysisError::UnsupportedContent(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AnalysisError::UnsupportedAccent { .. } => StatusCode::BAD_REQUEST,
            AnalysisError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AnalysisError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AnalysisError::AudioProcessing(_)
            | AnalysisError::InferenceFailed { .. }
            | AnalysisError::MalformedResult(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InvalidRequest(RequestValidationError::InvalidUrlFormat(_)) => {
                "INVALID_URL"
            }
            AnalysisError::InvalidRequest(RequestValidationError::BadScheme(_)) => "BAD_SCHEME",
            AnalysisError::InvalidRequest(RequestValidationError::UnsupportedLanguage(_)) => {
                "UNSUPPORTED_LANGUAGE"
            }
            AnalysisError::UnsupportedContent(_) => "UNSUPPORTED_CONTENT",
            AnalysisError::UnsupportedAccent { .. } => "UNSUPPORTED_ACCENT",
            AnalysisError::Unauthorized(_) => "UNAUTHORIZED",
            AnalysisError::RateLimited(_) => "RATE_LIMITED",
            AnalysisError::AudioProcessing(_)
            | AnalysisError::InferenceFailed { .. }
            | AnalysisError::MalformedResult(_) => "ANALYSIS_FAILED",
            AnalysisError::Cache(_) => "CACHE_UNAVAILABLE",
        }
    }

    /// True for failures caused by the request rather than by this service or its dependencies
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Terminal | ErrorKind::Transient => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Display of this error and every source, joined with ": "
    pub fn cause_chain(&self) -> String {
        let mut chain = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        chain
    }
}

impl From<NormalizeError> for AnalysisError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::BadScheme(scheme) => {
                AnalysisError::InvalidRequest(RequestValidationError::BadScheme(scheme))
            }
            NormalizeError::UnsupportedContent(detail) => AnalysisError::UnsupportedContent(detail),
            NormalizeError::ProcessingFailed(cause) => AnalysisError::AudioProcessing(cause),
        }
    }
}

impl From<ClassifyError> for AnalysisError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::UnsupportedAccent { label, supported } => {
                AnalysisError::UnsupportedAccent { label, supported }
            }
            ClassifyError::InferenceFailed { attempts, source } => {
                AnalysisError::InferenceFailed { attempts, source }
            }
            ClassifyError::MalformedResult(detail) => AnalysisError::MalformedResult(detail),
            ClassifyError::Cache(err) => AnalysisError::Cache(err),
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        }));

        let mut response = (status, body).into_response();

        if let AnalysisError::RateLimited(limit) = &self {
            let retry_after = limit.retry_after.as_secs().max(1);
            if let Ok(value) = retry_after.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, AnalysisError>;
