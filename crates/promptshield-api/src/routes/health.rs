use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use promptshield::HealthState;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.pipeline.health().await;

    let code = match health.status {
        HealthState::Healthy => StatusCode::OK,
        HealthState::Degraded => StatusCode::PARTIAL_CONTENT,
        HealthState::Critical => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, Json(health))
}
