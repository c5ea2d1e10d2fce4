//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Refuse deployments that would expose an unauthenticated admin surface
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{RelayConfig, TargetStrategy, PLACEHOLDER_API_KEY};

/// Upper bound for body previews in diagnostic records.
pub const MAX_PREVIEW_BYTES: usize = 64 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check that `raw` is an absolute http(s) URL with a host.
pub fn check_target_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("URL is empty".to_string());
    }
    let url = Url::parse(trimmed).map_err(|e| format!("not a valid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(url)
}

/// Validate a loaded configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if !config.listener.webhook_path.starts_with('/') {
        errors.push(ValidationError::new("listener.webhook_path", "must start with '/'"));
    }
    if config.listener.webhook_path.starts_with("/admin") {
        errors.push(ValidationError::new(
            "listener.webhook_path",
            "must not live under /admin",
        ));
    }

    if let Err(message) = check_target_url(&config.target.default_url) {
        errors.push(ValidationError::new("target.default_url", message));
    }
    if config.target.strategy == TargetStrategy::Persisted
        && config.target.state_path.trim().is_empty()
    {
        errors.push(ValidationError::new(
            "target.state_path",
            "required when strategy is 'persisted'",
        ));
    }

    if !config.upstream.webhook_path.starts_with('/') {
        errors.push(ValidationError::new("upstream.webhook_path", "must start with '/'"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.connect_secs > config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "timeouts.connect_secs",
            "must not exceed timeouts.request_secs",
        ));
    }

    if config
        .headers
        .forward_prefixes
        .iter()
        .any(|p| p.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "headers.forward_prefixes",
            "prefixes must be non-empty",
        ));
    }

    if config.diagnostics.preview_bytes > MAX_PREVIEW_BYTES {
        errors.push(ValidationError::new(
            "diagnostics.preview_bytes",
            format!("must be at most {}", MAX_PREVIEW_BYTES),
        ));
    }

    if config.admin.enabled {
        if config.target.strategy != TargetStrategy::Persisted {
            errors.push(ValidationError::new(
                "admin.enabled",
                "the admin surface requires target.strategy = 'persisted'",
            ));
        }
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "a real API key is required when admin is enabled",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
