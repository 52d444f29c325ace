//! Common error types for accent services

use thiserror::Error;

/// Common result type for accent service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across accent services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
