//! Startup and wiring errors.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
