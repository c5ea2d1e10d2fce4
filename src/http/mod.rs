//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → webhook path → relay engine → always-200 reply
//!     → /admin/*     → admin handlers (bearer auth)
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer, InnerState};
