//! # Accent Common Library
//!
//! Shared code for the accent analysis services including:
//! - Error and result types
//! - Configuration file loading and setting resolution
//! - Shared-secret API key checks

pub mod auth;
pub mod config;
pub mod error;

pub use error::{Error, Result};
