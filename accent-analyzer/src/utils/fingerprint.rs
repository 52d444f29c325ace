//! Content fingerprints used as cache key digests

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`
///
/// Stable across processes, so instances sharing a cache store agree on keys.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
