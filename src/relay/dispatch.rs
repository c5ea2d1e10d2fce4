//! Upstream dispatch.
//!
//! # Responsibilities
//! - POST the raw body to `<target><webhook_path>`
//! - Enforce connect and total timeouts
//! - Pick certificate verification per target (loopback may be trusted)
//! - Capture status, body and transport error into a `DispatchOutcome`
//!
//! # Design Decisions
//! - Exactly one attempt; no retries (POST webhooks are not idempotent)
//! - Never returns an error: every failure is folded into the outcome
//! - Certificate checks are only relaxed when the deployment opts in AND the
//!   resolved host is loopback

use axum::body::Bytes;
use axum::http::HeaderMap;
use std::error::Error as _;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use url::{Host, Url};

use crate::config::{TimeoutConfig, UpstreamConfig};

/// Result of the single delivery attempt for one inbound request.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Full endpoint the body was (or would have been) sent to.
    pub endpoint: String,
    /// Upstream HTTP status; `None` on transport failure.
    pub status: Option<u16>,
    /// Upstream response body, when one was read.
    pub body: Option<Bytes>,
    /// Transport error description.
    pub error: Option<String>,
    pub elapsed: Duration,
    /// False when the request never reached the network.
    pub attempted: bool,
    /// Whether certificate verification was skipped for this attempt.
    pub tls_verification_skipped: bool,
}

impl DispatchOutcome {
    /// Outcome for a request that never reached the network.
    pub fn not_attempted(endpoint: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: None,
            body: None,
            error: Some(error.into()),
            elapsed: Duration::ZERO,
            attempted: false,
            tls_verification_skipped: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(200)
    }
}

/// Issues outbound webhook deliveries.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    verified: reqwest::Client,
    loopback_trusting: Option<reqwest::Client>,
    webhook_path: String,
}

impl Dispatcher {
    pub fn new(
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, reqwest::Error> {
        let verified = Self::client_builder(upstream, timeouts).build()?;
        let loopback_trusting = if upstream.skip_tls_verify_for_loopback {
            Some(
                Self::client_builder(upstream, timeouts)
                    .danger_accept_invalid_certs(true)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            verified,
            loopback_trusting,
            webhook_path: upstream.webhook_path.clone(),
        })
    }

    fn client_builder(
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
    ) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .user_agent(upstream.user_agent.clone())
    }

    /// Full endpoint URL for a target base.
    pub fn endpoint(&self, target_url: &str) -> String {
        format!("{}{}", target_url.trim_end_matches('/'), self.webhook_path)
    }

    /// Deliver `body` to the target. Never fails; see `DispatchOutcome`.
    pub async fn dispatch(
        &self,
        target_url: &str,
        body: Bytes,
        headers: HeaderMap,
    ) -> DispatchOutcome {
        let endpoint = self.endpoint(target_url);
        let parsed = match Url::parse(&endpoint) {
            Ok(url) => url,
            Err(e) => {
                return DispatchOutcome::not_attempted(
                    endpoint,
                    format!("invalid endpoint URL: {}", e),
                );
            }
        };

        let (client, tls_verification_skipped) = match &self.loopback_trusting {
            Some(trusting) if is_loopback_target(&parsed) => (trusting, true),
            _ => (&self.verified, false),
        };

        let start = Instant::now();
        let result = client.post(parsed).headers(headers).body(body).send().await;

        let (status, body, error) = match result {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(bytes) => (Some(status), Some(bytes), None),
                    Err(e) => (Some(status), None, Some(describe_error(&e))),
                }
            }
            Err(e) => (None, None, Some(describe_error(&e))),
        };

        DispatchOutcome {
            endpoint,
            status,
            body,
            error,
            elapsed: start.elapsed(),
            attempted: true,
            tls_verification_skipped,
        }
    }
}

/// True when the URL points at this machine.
pub fn is_loopback_target(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

/// Flatten a reqwest error and its source chain into one line.
fn describe_error(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else if error.is_body() || error.is_decode() {
        "body"
    } else if error.is_redirect() {
        "redirect"
    } else {
        "request"
    };

    let mut message = format!("{}: {}", kind, error);
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
