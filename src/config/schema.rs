//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder admin key that validation refuses to accept.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the webhook relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, webhook path, TLS).
    pub listener: ListenerConfig,

    /// Where webhook calls are forwarded to.
    pub target: TargetSettings,

    /// Outbound request settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound header forwarding policy.
    pub headers: HeaderPolicyConfig,

    /// Append-only diagnostic log.
    pub diagnostics: DiagnosticsConfig,

    /// Acknowledgement shaping.
    pub reconcile: ReconcileConfig,

    /// Administrative surface.
    pub admin: AdminConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path the messaging platform posts webhooks to.
    pub webhook_path: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            webhook_path: "/".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// How the upstream target URL is obtained.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStrategy {
    /// Always `default_url`.
    Static,
    /// Read from the state record on every dispatch, falling back to `default_url`.
    #[default]
    Persisted,
}

/// Target resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TargetSettings {
    pub strategy: TargetStrategy,

    /// Built-in default backend base URL.
    pub default_url: String,

    /// JSON record holding the administratively updated URL.
    pub state_path: String,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            strategy: TargetStrategy::Persisted,
            default_url: "http://127.0.0.1:8001".to_string(),
            state_path: "webhook_config.json".to_string(),
        }
    }
}

/// Outbound request settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Path appended to the target base URL.
    pub webhook_path: String,

    /// User-Agent sent to the backend.
    pub user_agent: String,

    /// Accept invalid certificates, but only when the target host is loopback.
    pub skip_tls_verify_for_loopback: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            webhook_path: "/api/webhook".to_string(),
            user_agent: "TelegramWebhookProxy/1.0".to_string(),
            skip_tls_verify_for_loopback: false,
        }
    }
}

/// Timeout configuration for the upstream dispatch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total request timeout (connect, send, and read the body) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}

/// Which inbound headers reach the backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Case-insensitive name prefixes that are forwarded.
    pub forward_prefixes: Vec<String>,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            forward_prefixes: vec!["content-".to_string(), "x-telegram-".to_string()],
        }
    }
}

/// Diagnostic log sink.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// JSON-lines file; `None` disables the sink.
    pub log_path: Option<String>,

    /// Environment tag stamped on records and acknowledgements.
    pub environment: Option<String>,

    /// How many bytes of request/response bodies are previewed.
    pub preview_bytes: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            environment: None,
            preview_bytes: 200,
        }
    }
}

/// Acknowledgement shaping.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Include the resolved backend URL in synthesized acknowledgements.
    pub expose_backend_url: bool,
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
