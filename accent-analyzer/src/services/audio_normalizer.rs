//! Audio normalizer
//!
//! Fetches audio from a URL and converts it to the classifier's canonical
//! signal: 16 kHz, mono, 16-bit PCM, peak-normalized.
//!
//! Downloaded bytes are staged in a [`NamedTempFile`] owned by the decode
//! task, so the file is removed on every exit path.

use anyhow::{anyhow, Context};
use reqwest::{StatusCode, Url};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::analysis::audio_extension;
use crate::models::{NormalizedAudio, TARGET_SAMPLE_RATE};
use crate::utils::{decode_audio_file, resample_mono};

const USER_AGENT: &str = concat!("accent-analyzer/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Normalizer errors
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// URL scheme other than http/https
    #[error("Invalid URL scheme: {0}")]
    BadScheme(String),

    /// Non-200 response or non-audio content type; nothing was decoded
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Fetch or decode failure; the cause is for logs only
    #[error("Audio processing failed")]
    ProcessingFailed(#[source] anyhow::Error),
}

/// Content types accepted from the audio host: `audio/*` or a generic binary stream
pub fn is_supported_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("audio/") || mime == "application/octet-stream"
}

/// Fetch + decode + resample + quantize
pub struct AudioNormalizer {
    http_client: reqwest::Client,
    target_sample_rate: u32,
    /// Directory for staged downloads; system temp dir when `None`
    staging_dir: Option<PathBuf>,
}

impl AudioNormalizer {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            target_sample_rate: TARGET_SAMPLE_RATE,
            staging_dir: None,
        }
    }

    /// Normalizer with its own HTTP client (30 s timeout)
    pub fn with_default_client() -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to build audio fetch client")?;
        Ok(Self::new(http_client))
    }

    /// Stage downloads under `dir` instead of the system temp dir
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Download `url` and convert it to normalized PCM
    pub async fn normalize(&self, url: &Url) -> Result<NormalizedAudio, NormalizeError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NormalizeError::BadScheme(url.scheme().to_string()));
        }

        let bytes = self.fetch(url).await?;
        let extension = audio_extension(url).unwrap_or_else(|| "bin".to_string());

        let staged = self
            .stage(&bytes, &extension)
            .map_err(NormalizeError::ProcessingFailed)?;
        drop(bytes);

        let target_rate = self.target_sample_rate;
        let samples = tokio::task::spawn_blocking(move || {
            let result = decode_and_resample(staged.path(), target_rate);
            drop(staged);
            result
        })
        .await
        .map_err(|e| NormalizeError::ProcessingFailed(anyhow!("Decode task failed: {}", e)))?
        .map_err(NormalizeError::ProcessingFailed)?;

        let audio = NormalizedAudio::from_samples(&samples).ok_or_else(|| {
            NormalizeError::ProcessingFailed(anyhow!("Decoded audio contains no samples"))
        })?;

        tracing::debug!(
            url = %url,
            samples = audio.sample_count(),
            duration_seconds = format!("{:.2}", audio.duration_seconds()),
            "Audio normalized"
        );

        Ok(audio)
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, NormalizeError> {
        tracing::debug!(url = %url, "Fetching audio");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .context("Audio download request failed")
            .map_err(NormalizeError::ProcessingFailed)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NormalizeError::UnsupportedContent(format!(
                "audio host returned HTTP {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_supported_content_type(&content_type) {
            return Err(NormalizeError::UnsupportedContent(format!(
                "content type '{}' is not audio",
                content_type
            )));
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read audio body")
            .map_err(NormalizeError::ProcessingFailed)?;

        tracing::debug!(url = %url, bytes = bytes.len(), content_type = %content_type, "Audio downloaded");

        Ok(bytes.to_vec())
    }

    fn stage(&self, bytes: &[u8], extension: &str) -> anyhow::Result<NamedTempFile> {
        let suffix = format!(".{}", extension);
        let mut builder = tempfile::Builder::new();
        builder.prefix("accent-").suffix(&suffix);

        let mut staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("Failed to create staging file")?;

        staged
            .write_all(bytes)
            .and_then(|_| staged.flush())
            .context("Failed to write staging file")?;

        Ok(staged)
    }
}

fn decode_and_resample(path: &Path, target_rate: u32) -> anyhow::Result<Vec<f32>> {
    let decoded = decode_audio_file(path)?;
    resample_mono(decoded.samples, decoded.sample_rate, target_rate)
}
