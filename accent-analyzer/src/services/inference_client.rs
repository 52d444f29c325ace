//! Remote accent classification client
//!
//! **Outbound:** `POST {inference_url}/{model_id}` with the raw PCM body and a
//! bearer token. The audio-classification task answers with ranked labels:
//!
//! ```json
//! [{"label": "American", "score": 0.91}, {"label": "British", "score": 0.06}]
//! ```
//!
//! A flat `{"accent": "...", "confidence": 91.0}` object is accepted as well.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::models::RawPrediction;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL_ID: &str = "speechbrain/lang-id-voxlingua107-ecapa";
const USER_AGENT: &str = concat!("accent-analyzer/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Inference client errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

impl ModelError {
    /// Transient errors are worth retrying: network failures, 5xx and 429
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Network(_) => ErrorKind::Transient,
            ModelError::Api(status, _) if *status >= 500 || *status == 429 => ErrorKind::Transient,
            ModelError::Api(_, _) | ModelError::Malformed(_) => ErrorKind::Terminal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Remote classification capability: audio bytes -> label + confidence
#[async_trait]
pub trait AccentModel: Send + Sync {
    async fn classify(&self, audio: &[u8], model_id: &str) -> Result<RawPrediction, ModelError>;
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Ranked(Vec<LabelScore>),
    Direct(RawPrediction),
}

/// Parse an inference response body into the top prediction
///
/// Ranked scores in [0, 1] are converted to a percentage rounded to two
/// decimals.
pub fn parse_inference_response(body: &str) -> Result<RawPrediction, ModelError> {
    let response: InferenceResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;

    match response {
        InferenceResponse::Direct(prediction) => Ok(prediction),
        InferenceResponse::Ranked(labels) => {
            let top = labels
                .into_iter()
                .filter(|l| l.score.is_finite())
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .ok_or_else(|| ModelError::Malformed("empty label list".to_string()))?;

            Ok(RawPrediction {
                accent: top.label,
                confidence: (top.score * 10_000.0).round() / 100.0,
            })
        }
    }
}

/// Hosted inference API client
pub struct HuggingFaceClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HuggingFaceClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id)
    }
}

#[async_trait]
impl AccentModel for HuggingFaceClient {
    async fn classify(&self, audio: &[u8], model_id: &str) -> Result<RawPrediction, ModelError> {
        let url = self.endpoint(model_id);

        tracing::debug!(model_id, bytes = audio.len(), "Querying inference API");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Api(status.as_u16(), body));
        }

        let prediction = parse_inference_response(&body)?;

        tracing::info!(
            model_id,
            accent = %prediction.accent,
            confidence = prediction.confidence,
            "Inference successful"
        );

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ranked_labels_picks_top_score() {
        let prediction = parse_inference_response(
            r#"[{"label": "British", "score": 0.12}, {"label": "American", "score": 0.8731}]"#,
        )
        .unwrap();

        assert_eq!(prediction.accent, "American");
        assert_eq!(prediction.confidence, 87.31);
    }

    #[test]
    fn test_parse_direct_prediction() {
        let prediction =
            parse_inference_response(r#"{"accent": "Australian", "confidence": 64.0}"#).unwrap();
        assert_eq!(prediction.accent, "Australian");
        assert_eq!(prediction.confidence, 64.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_inference_response("<html>oops</html>"),
            Err(ModelError::Malformed(_))
        ));
        assert!(matches!(
            parse_inference_response("[]"),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ModelError::Network("timeout".into()).is_transient());
        assert!(ModelError::Api(503, "loading".into()).is_transient());
        assert!(ModelError::Api(429, "slow down".into()).is_transient());
        assert!(!ModelError::Api(401, "bad token".into()).is_transient());
        assert!(!ModelError::Malformed("eof".into()).is_transient());
    }

    #[test]
    fn test_endpoint_joins_model_id() {
        let client = HuggingFaceClient::new("https://inference.example.com/models/", "token").unwrap();
        assert_eq!(
            client.endpoint("org/model"),
            "https://inference.example.com/models/org/model"
        );
    }
}
