//! HTTP transport for the PromptShield detection engine.

mod config;
mod error;
mod routes;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use promptshield::{FallbackPipeline, ModelRegistry};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Fatal error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    tracing::info!(addr = %config.listen_addr, "Starting PromptShield API");

    let registry = match &config.model_catalog {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)?;
            let registry = ModelRegistry::from_yaml(&yaml)?;
            tracing::info!(
                path = %path.display(),
                models = registry.enabled_ordered().len(),
                "model catalog loaded"
            );
            registry
        }
        None => ModelRegistry::with_defaults(),
    };

    let pipeline = FallbackPipeline::with_registry(registry)
        .with_confidence_threshold(config.confidence_threshold);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        request_timeout: config.request_timeout,
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Received shutdown signal");
}
