//! Accent vocabulary and classification results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of English accents the service reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accent {
    British,
    American,
    Australian,
}

/// Every accepted label, in display order
pub const SUPPORTED_ACCENTS: [Accent; 3] = [Accent::British, Accent::American, Accent::Australian];

impl Accent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Accent::British => "British",
            Accent::American => "American",
            Accent::Australian => "Australian",
        }
    }

    /// Comma-separated list of supported labels for error messages
    pub fn supported_list() -> String {
        SUPPORTED_ACCENTS
            .iter()
            .map(Accent::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Accent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accent {
    type Err = PredictionError;

    /// Exact match only; near-misses are rejected rather than coerced
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_ACCENTS
            .iter()
            .copied()
            .find(|accent| accent.as_str() == s)
            .ok_or_else(|| PredictionError::UnsupportedAccent(s.to_string()))
    }
}

/// Unvalidated model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub accent: String,
    /// Percentage, expected in [0, 100]
    pub confidence: f64,
}

/// Reasons a raw prediction cannot become a classification result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Unsupported accent type '{0}'")]
    UnsupportedAccent(String),

    #[error("Confidence {0} is outside [0, 100]")]
    ConfidenceOutOfRange(f64),
}

/// Validated classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub accent: Accent,
    pub confidence: f64,
}

impl ClassificationResult {
    /// Validate raw model output against the accent vocabulary
    pub fn from_prediction(raw: &RawPrediction) -> Result<Self, PredictionError> {
        let accent = raw.accent.parse::<Accent>()?;

        if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
            return Err(PredictionError::ConfidenceOutOfRange(raw.confidence));
        }

        Ok(Self {
            accent,
            confidence: raw.confidence,
        })
    }

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::for_confidence(self.confidence)
    }
}

/// Confidence bands: high >= 80%, medium 50-79%, low < 50%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn for_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceBand::High
        } else if confidence >= 50.0 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}
