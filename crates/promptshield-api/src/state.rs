use std::sync::Arc;
use std::time::Duration;

use promptshield::FallbackPipeline;

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FallbackPipeline>,
    pub request_timeout: Duration,
}
