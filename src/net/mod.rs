//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plain: tokio TcpListener handed to axum::serve
//!     → TLS:   tls.rs loads PEM material, axum-server terminates TLS
//!     → Hand off to HTTP layer
//! ```

pub mod tls;
