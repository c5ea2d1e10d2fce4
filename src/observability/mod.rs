//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stdout)
//!     → metrics.rs (counters, histograms)
//!
//! The relay engine additionally writes:
//!     → diagnostics.rs (append-only JSON-lines file, two records per webhook)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every record
//! - The diagnostic file is best-effort; it can never fail a webhook

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use diagnostics::{DiagnosticLog, LogRecord};
