pub mod detect;
pub mod health;
pub mod ops;

use axum::Router;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(detect::router())
        .merge(health::router())
        .merge(ops::router())
        .with_state(state)
}
