//! Test Helper Utilities
//!
//! Shared utilities for testing accent-analyzer

#![allow(dead_code)]

pub mod audio_generator;
pub mod audio_server;
pub mod cache_server;
pub mod mock_model;
pub mod test_app;

// Re-export commonly used items
pub use audio_generator::{generate_test_wav, AudioConfig};
pub use audio_server::{AudioServer, ServedFile};
pub use cache_server::{closed_cache_url, CacheServer, CACHE_TOKEN};
pub use mock_model::{MockBehavior, MockModel};
pub use test_app::{fast_retry_policy, TestApp, TEST_API_KEY};
