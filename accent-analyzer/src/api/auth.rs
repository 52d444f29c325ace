//! API key middleware
//!
//! Protected routes require the configured shared secret in the `X-API-Key`
//! header. The check runs before any handler work, including rate limiting.

use accent_common::auth::verify_api_key;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AnalysisError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without a matching `X-API-Key` header (401)
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AnalysisError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    if let Err(err) = verify_api_key(provided, &state.api_key) {
        tracing::warn!(
            path = %request.uri().path(),
            reason = %err,
            "Rejected unauthenticated request"
        );
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
