//! Counting stand-in for the remote accent model

use accent_analyzer::models::RawPrediction;
use accent_analyzer::services::{AccentModel, ModelError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// How the mock answers
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return this label and confidence
    Succeed { label: String, confidence: f64 },
    /// Always fail with a transient 503
    AlwaysUnavailable,
    /// Fail transiently `failures` times, then succeed
    FlakyThenSucceed { failures: u32, label: String, confidence: f64 },
    /// Sleep before answering, for concurrency tests
    Slow { delay: Duration, label: String, confidence: f64 },
}

pub struct MockModel {
    behavior: MockBehavior,
    calls: AtomicU32,
}

impl MockModel {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    pub fn answering(label: &str, confidence: f64) -> Self {
        Self::new(MockBehavior::Succeed {
            label: label.to_string(),
            confidence,
        })
    }

    /// Number of classify calls received
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn prediction(label: &str, confidence: f64) -> RawPrediction {
    RawPrediction {
        accent: label.to_string(),
        confidence,
    }
}

#[async_trait]
impl AccentModel for MockModel {
    async fn classify(&self, audio: &[u8], _model_id: &str) -> Result<RawPrediction, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(!audio.is_empty(), "model must never receive an empty buffer");

        match &self.behavior {
            MockBehavior::Succeed { label, confidence } => Ok(prediction(label, *confidence)),
            MockBehavior::AlwaysUnavailable => {
                Err(ModelError::Api(503, "model is loading".to_string()))
            }
            MockBehavior::FlakyThenSucceed {
                failures,
                label,
                confidence,
            } => {
                if call <= *failures {
                    Err(ModelError::Network("connection reset".to_string()))
                } else {
                    Ok(prediction(label, *confidence))
                }
            }
            MockBehavior::Slow {
                delay,
                label,
                confidence,
            } => {
                tokio::time::sleep(*delay).await;
                Ok(prediction(label, *confidence))
            }
        }
    }
}
