//! Webhook relay subsystem.
//!
//! # Data Flow
//! ```text
//! inbound POST
//!     → request.rs   (capture raw body + headers, immutable)
//!     → target       (resolve current backend URL)
//!     → headers.rs   (allowlist filter, force Content-Type)
//!     → dispatch.rs  (single bounded POST → DispatchOutcome)
//!     → reconcile.rs (passthrough or acknowledgement, always 200)
//!     → reply
//!
//! diagnostics: one record before dispatch, one after
//! ```
//!
//! # Design Decisions
//! - One engine, parameterized by config, instead of one relay per deployment
//! - Nothing past capture can fail the caller's request

pub mod dispatch;
pub mod engine;
pub mod headers;
pub mod reconcile;
pub mod request;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use engine::ForwardingEngine;
pub use headers::HeaderFilter;
pub use reconcile::{Reconciler, Reply, ReplyKind};
pub use request::InboundRequest;
