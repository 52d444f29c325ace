//! Shared-secret API key checks
//!
//! Callers present the secret in a request header; the service compares it
//! against the configured key. Pure functions only, no HTTP framework types.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum accepted length for a configured API key
pub const MIN_API_KEY_LEN: usize = 32;

/// API key check failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiKeyError {
    /// Header absent or empty
    #[error("API Key is required")]
    Missing,

    /// Header present but does not match
    #[error("Invalid API Key")]
    Invalid,
}

/// Verify a presented key against the configured key
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests regardless of input length.
pub fn verify_api_key(provided: Option<&str>, expected: &str) -> Result<(), ApiKeyError> {
    let provided = match provided {
        Some(key) if !key.is_empty() => key,
        _ => return Err(ApiKeyError::Missing),
    };

    let provided_digest = Sha256::digest(provided.as_bytes());
    let expected_digest = Sha256::digest(expected.as_bytes());

    let diff = provided_digest
        .iter()
        .zip(expected_digest.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        Ok(())
    } else {
        Err(ApiKeyError::Invalid)
    }
}

/// Check that a configured key is long enough to be used as a shared secret
pub fn is_strong_key(key: &str) -> bool {
    key.trim().len() >= MIN_API_KEY_LEN
}
