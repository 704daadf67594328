use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use promptshield::{DetectionRequest, DetectionResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/detect", post(detect))
}

async fn detect(
    State(state): State<AppState>,
    Json(request): Json<DetectionRequest>,
) -> Result<Json<DetectionResponse>, ApiError> {
    // Log sizes, never content.
    tracing::info!(text_len = request.text.len(), "processing detection request");

    let deadline = Instant::now() + state.request_timeout;
    let response = state
        .pipeline
        .analyze_with_deadline(&request, Some(deadline))
        .await?;

    Ok(Json(response))
}
