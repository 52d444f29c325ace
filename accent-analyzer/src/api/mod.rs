//! HTTP API handlers for accent-analyzer

pub mod analyze;
pub mod auth;
pub mod health;

pub use analyze::analyze_routes;
pub use auth::{require_api_key, API_KEY_HEADER};
pub use health::health_routes;
