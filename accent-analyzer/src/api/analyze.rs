//! Accent analysis endpoint
//!
//! **POST /api/v1/analyze**
//! ```json
//! {"url": "https://host/clip.wav", "language": "en"}
//! ```
//! Order of checks: API key (middleware), request validation, rate limit,
//! then the pipeline. Rejected bodies never count against the caller.

use axum::{
    extract::{ConnectInfo, State},
    routing::post,
    Json, Router,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AnalysisError, ApiResult};
use crate::models::{AnalysisRequest, AnalysisResponse, AudioRequest};
use crate::AppState;

/// POST /api/v1/analyze
pub async fn analyze_accent(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<AnalysisRequest>,
) -> ApiResult<Json<AnalysisResponse>> {
    // Without connect info (in-process callers) every request shares one bucket
    let caller = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", request_id = %request_id, caller = %caller);

    async move {
        let request = AudioRequest::validate(body).map_err(|e| {
            tracing::warn!(error = %e, "Invalid analysis request");
            AnalysisError::from(e)
        })?;

        state.rate_limiter.check(caller)?;

        tracing::info!(url = %request.url(), "Analysis requested");

        let response = state.pipeline.analyze(&request).await?;

        tracing::info!(
            accent = %response.result.accent,
            confidence = response.result.confidence,
            source = ?response.source,
            "Analysis served"
        );

        Ok::<_, AnalysisError>(Json(response))
    }
    .instrument(span)
    .await
}

/// Build analysis routes (API key required; layered in `build_router`)
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/v1/analyze", post(analyze_accent))
}
