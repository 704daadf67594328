//! Error types for promptshield

use thiserror::Error;

use crate::types::DetectionResponse;

/// Errors produced by the detection core.
///
/// All of these are non-fatal to the process. `CircuitOpen` and
/// `AllModelsFailed` are control-flow sentinels: the first tells the
/// orchestrator to skip a model without charging its breaker, the second
/// carries the degraded verdict so the transport can return it alongside a
/// 503.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("all detection models are currently unavailable")]
    AllModelsFailed(Box<DetectionResponse>),

    #[error("model {0} not found")]
    ModelNotFound(String),

    #[error("credential environment variable {0} is not set")]
    MissingCredential(String),

    #[error("provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request deadline exceeded")]
    Timeout,

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for promptshield operations
pub type Result<T> = std::result::Result<T, Error>;
