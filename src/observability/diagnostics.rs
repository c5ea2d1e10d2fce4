//! Append-only diagnostic log of webhook exchanges.
//!
//! Two JSON lines per inbound request: `received` at capture and
//! `dispatched` once the outcome is known. The file is never read back,
//! truncated or rotated by the relay.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::DiagnosticsConfig;
use crate::relay::dispatch::DispatchOutcome;
use crate::relay::request::InboundRequest;

/// One self-contained diagnostic record.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    Received {
        timestamp: DateTime<Utc>,
        request_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_addr: Option<String>,
        input_bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
        forwarded_headers: Vec<String>,
        target_url: String,
        input_preview: String,
    },
    Dispatched {
        timestamp: DateTime<Utc>,
        request_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
        endpoint: String,
        status: Option<u16>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        elapsed_ms: u64,
        tls_verification_skipped: bool,
        response_bytes: usize,
        response_preview: String,
    },
}

/// Write-only diagnostic sink. Every failure is swallowed.
#[derive(Debug)]
pub struct DiagnosticLog {
    sink: Option<PathBuf>,
    environment: Option<String>,
    preview_bytes: usize,
    append_lock: Mutex<()>,
}

impl DiagnosticLog {
    pub fn new(sink: Option<PathBuf>, environment: Option<String>, preview_bytes: usize) -> Self {
        Self {
            sink,
            environment,
            preview_bytes,
            append_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(
            config.log_path.as_ref().map(PathBuf::from),
            config.environment.clone(),
            config.preview_bytes,
        )
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self::new(None, None, 0)
    }

    pub fn received_record(
        &self,
        request: &InboundRequest,
        forwarded: &axum::http::HeaderMap,
        target_url: &str,
    ) -> LogRecord {
        LogRecord::Received {
            timestamp: request.received_at(),
            request_id: request.request_id().to_string(),
            environment: self.environment.clone(),
            client_addr: request.client_addr().map(|a| a.to_string()),
            input_bytes: request.body().len(),
            user_agent: request.user_agent().map(str::to_string),
            forwarded_headers: forwarded.keys().map(|k| k.as_str().to_string()).collect(),
            target_url: target_url.to_string(),
            input_preview: preview(request.body(), self.preview_bytes),
        }
    }

    pub fn dispatched_record(
        &self,
        request: &InboundRequest,
        outcome: &DispatchOutcome,
    ) -> LogRecord {
        let response = outcome.body.as_deref().unwrap_or_default();
        LogRecord::Dispatched {
            timestamp: Utc::now(),
            request_id: request.request_id().to_string(),
            environment: self.environment.clone(),
            endpoint: outcome.endpoint.clone(),
            status: outcome.status,
            success: outcome.is_success(),
            error: outcome.error.clone(),
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            tls_verification_skipped: outcome.tls_verification_skipped,
            response_bytes: response.len(),
            response_preview: preview(response, self.preview_bytes),
        }
    }

    /// Append one record. Never fails and never panics.
    pub async fn record(&self, record: &LogRecord) {
        let Some(path) = self.sink.as_deref() else {
            return;
        };

        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(error = %e, "Diagnostic record not serializable");
                return;
            }
        };
        line.push(b'\n');

        let _guard = self.append_lock.lock().await;
        if let Err(e) = append_line(path, &line).await {
            tracing::debug!(
                path = ?path,
                error = %e,
                "Diagnostic sink unavailable, record dropped"
            );
        }
    }
}

async fn append_line(path: &Path, line: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line).await?;
    file.flush().await
}

/// First `limit` bytes of a body, lossily decoded.
pub fn preview(bytes: &[u8], limit: usize) -> String {
    let end = bytes.len().min(limit);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
