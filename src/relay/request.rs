//! Captured inbound webhook call.

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;

/// An inbound webhook call, immutable once captured.
///
/// The body is kept as raw bytes and never interpreted.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    body: Bytes,
    headers: HeaderMap,
    received_at: DateTime<Utc>,
    request_id: String,
    client_addr: Option<SocketAddr>,
}

impl InboundRequest {
    pub fn capture(
        headers: HeaderMap,
        body: Bytes,
        request_id: impl Into<String>,
        client_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            body,
            headers,
            received_at: Utc::now(),
            request_id: request_id.into(),
            client_addr,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }
}
