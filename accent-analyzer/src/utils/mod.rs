//! Utility modules for accent-analyzer

pub mod audio_decoder;
pub mod fingerprint;
pub mod retry;

pub use audio_decoder::{decode_audio_file, resample_mono, DecodedAudio};
pub use fingerprint::sha256_hex;
pub use retry::{retry_with_backoff, RetryError, RetryPolicy};
