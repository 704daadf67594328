use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use promptshield::{CircuitState, Diagnostics, MetricsSnapshot};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/metrics", get(metrics))
        .route("/v1/circuit-breakers", get(circuit_breakers))
        .route("/v1/circuit-breakers/{model}/reset", post(reset_breaker))
        .route("/v1/diagnostics", get(diagnostics))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics())
}

async fn circuit_breakers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.pipeline.breaker_stats().await;

    let mut open = 0u32;
    let mut closed = 0u32;
    let mut half_open = 0u32;
    for breaker in stats.values() {
        match breaker.state {
            CircuitState::Open => open += 1,
            CircuitState::Closed => closed += 1,
            CircuitState::HalfOpen => half_open += 1,
        }
    }

    Json(serde_json::json!({
        "circuit_breakers": stats,
        "total_models": stats.len(),
        "summary": {
            "open": open,
            "closed": closed,
            "half_open": half_open,
            "healthy": closed + half_open,
        },
    }))
}

async fn reset_breaker(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.pipeline.reset_breaker(&model).await?;

    Ok(Json(serde_json::json!({
        "message": "Circuit breaker reset successfully",
        "model": model,
    })))
}

async fn diagnostics(State(state): State<AppState>) -> Json<Diagnostics> {
    Json(state.pipeline.diagnostics().await)
}
