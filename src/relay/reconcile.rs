//! Reply reconciliation.
//!
//! The messaging platform treats any non-200 reply as a failed delivery and
//! retries it. Backends have no idempotent replay protection, so the relay
//! acknowledges every call with 200 and leaves the real outcome to the logs.
//!
//! | upstream status | upstream body | reply                                  |
//! |-----------------|---------------|----------------------------------------|
//! | 200             | non-empty     | upstream body, verbatim                |
//! | anything else   | any           | `{"status":"forwarded","code":..}` ack |

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::relay::dispatch::DispatchOutcome;

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Passthrough,
    Acknowledgement,
}

/// The single reply sent back to the webhook caller.
#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyKind,
    pub body: Bytes,
}

impl Reply {
    /// Always 200.
    pub fn status(&self) -> StatusCode {
        StatusCode::OK
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Synthesized acknowledgement body.
#[derive(Debug, Serialize)]
struct Acknowledgement<'a> {
    status: &'static str,
    code: Option<u16>,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_url: Option<&'a str>,
}

/// Converts dispatch outcomes into replies.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    environment: Option<String>,
    expose_backend_url: bool,
}

impl Reconciler {
    pub fn new(environment: Option<String>, expose_backend_url: bool) -> Self {
        Self {
            environment,
            expose_backend_url,
        }
    }

    pub fn reconcile(
        &self,
        outcome: &DispatchOutcome,
        backend_url: &str,
        now: DateTime<Utc>,
    ) -> Reply {
        if outcome.is_success() {
            if let Some(body) = outcome.body.as_ref().filter(|b| !b.is_empty()) {
                return Reply {
                    kind: ReplyKind::Passthrough,
                    body: body.clone(),
                };
            }
        }

        let ack = Acknowledgement {
            status: "forwarded",
            code: outcome.status,
            timestamp: now.timestamp(),
            environment: self.environment.as_deref(),
            backend_url: self.expose_backend_url.then_some(backend_url),
        };
        let body = serde_json::to_vec(&ack)
            .unwrap_or_else(|_| br#"{"status":"forwarded","code":null}"#.to_vec());

        Reply {
            kind: ReplyKind::Acknowledgement,
            body: Bytes::from(body),
        }
    }
}
