use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Wall-clock budget for one detection request across the whole chain.
    pub request_timeout: Duration,
    pub confidence_threshold: f64,
    /// Optional YAML model catalog; the built-in catalog is used otherwise.
    pub model_catalog: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address: {0}")]
    InvalidAddr(#[from] std::net::AddrParseError),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()?;

        let request_timeout = env_parse::<u64>("REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let confidence_threshold = env_parse::<f64>("CONFIDENCE_THRESHOLD")?.unwrap_or(0.6);

        let model_catalog = std::env::var("MODEL_CATALOG").ok().map(PathBuf::from);

        Ok(Self {
            listen_addr,
            request_timeout,
            confidence_threshold,
            model_catalog,
        })
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(None),
    }
}
