use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use promptshield::DetectionResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("all detection models are temporarily unavailable")]
    AllModelsFailed(Box<DetectionResponse>),
    #[error("detection timed out")]
    Timeout,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<promptshield::Error> for ApiError {
    fn from(e: promptshield::Error) -> Self {
        match e {
            promptshield::Error::AllModelsFailed(response) => Self::AllModelsFailed(response),
            promptshield::Error::Timeout => Self::Timeout,
            promptshield::Error::ModelNotFound(name) => Self::NotFound(name),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Callers always get a well-formed verdict body; the 503 plus
            // Retry-After carries the operational signal.
            ApiError::AllModelsFailed(response) => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "60")],
                Json(*response),
            )
                .into_response(),
            ApiError::Timeout => error_body(StatusCode::REQUEST_TIMEOUT, self.to_string()),
            ApiError::NotFound(name) => error_body(
                StatusCode::NOT_FOUND,
                format!("circuit breaker not found: {name}"),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, Json(body)).into_response()
}
