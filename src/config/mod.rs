//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server rebuilds engine state and swaps it atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The target URL record is NOT part of this config; see `crate::target`

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, DiagnosticsConfig, HeaderPolicyConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ReconcileConfig, RelayConfig, SecurityConfig, TargetSettings,
    TargetStrategy, TimeoutConfig, TlsConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
