//! Telegram Webhook Relay Library

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod target;

pub use config::schema::RelayConfig;
pub use error::RelayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::ForwardingEngine;
