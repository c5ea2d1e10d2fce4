//! The forwarding engine.

use chrono::Utc;

use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::observability::DiagnosticLog;
use crate::relay::dispatch::{DispatchOutcome, Dispatcher};
use crate::relay::headers::HeaderFilter;
use crate::relay::reconcile::{Reconciler, Reply, ReplyKind};
use crate::relay::request::InboundRequest;
use crate::target::TargetResolver;

/// One configurable relay: resolve, filter, dispatch, reconcile, log.
#[derive(Debug)]
pub struct ForwardingEngine {
    resolver: TargetResolver,
    filter: HeaderFilter,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    diagnostics: DiagnosticLog,
}

impl ForwardingEngine {
    pub fn new(
        resolver: TargetResolver,
        filter: HeaderFilter,
        dispatcher: Dispatcher,
        reconciler: Reconciler,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            resolver,
            filter,
            dispatcher,
            reconciler,
            diagnostics,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            TargetResolver::from_settings(&config.target),
            HeaderFilter::new(&config.headers.forward_prefixes),
            Dispatcher::new(&config.upstream, &config.timeouts)?,
            Reconciler::new(
                config.diagnostics.environment.clone(),
                config.reconcile.expose_backend_url,
            ),
            DiagnosticLog::from_config(&config.diagnostics),
        ))
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Relay one captured webhook. Always yields a 200 reply.
    pub async fn relay(&self, request: InboundRequest) -> Reply {
        let target_url = self.resolver.resolve().await;
        let forwarded = self.filter.filter(request.headers());

        tracing::info!(
            request_id = %request.request_id(),
            input_bytes = request.body().len(),
            target = %target_url,
            "Webhook received"
        );
        self.diagnostics
            .record(&self.diagnostics.received_record(&request, &forwarded, &target_url))
            .await;

        let outcome = self
            .dispatcher
            .dispatch(&target_url, request.body().clone(), forwarded)
            .await;

        self.finish(&request, &target_url, outcome).await
    }

    /// Acknowledge a webhook whose body could not be captured.
    ///
    /// Nothing is sent upstream, but the caller still gets its 200.
    pub async fn acknowledge_unreadable(
        &self,
        request: InboundRequest,
        error: impl Into<String>,
    ) -> Reply {
        let target_url = self.resolver.resolve().await;
        let forwarded = self.filter.filter(request.headers());
        self.diagnostics
            .record(&self.diagnostics.received_record(&request, &forwarded, &target_url))
            .await;

        let outcome = DispatchOutcome::not_attempted(
            self.dispatcher.endpoint(&target_url),
            format!("inbound body rejected: {}", error.into()),
        );
        self.finish(&request, &target_url, outcome).await
    }

    async fn finish(
        &self,
        request: &InboundRequest,
        target_url: &str,
        outcome: DispatchOutcome,
    ) -> Reply {
        let reply = self.reconciler.reconcile(&outcome, target_url, Utc::now());

        let label = outcome_label(&outcome, reply.kind);
        match &outcome.error {
            Some(error) => tracing::warn!(
                request_id = %request.request_id(),
                endpoint = %outcome.endpoint,
                status = ?outcome.status,
                error = %error,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Webhook delivery failed, acknowledging anyway"
            ),
            None => tracing::info!(
                request_id = %request.request_id(),
                endpoint = %outcome.endpoint,
                status = ?outcome.status,
                outcome = label,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Webhook dispatched"
            ),
        }
        metrics::record_webhook(label, outcome.elapsed);

        self.diagnostics
            .record(&self.diagnostics.dispatched_record(request, &outcome))
            .await;

        reply
    }
}

fn outcome_label(outcome: &DispatchOutcome, kind: ReplyKind) -> &'static str {
    match (kind, outcome.status) {
        (ReplyKind::Passthrough, _) => "passthrough",
        (ReplyKind::Acknowledgement, Some(_)) => "upstream_error",
        (ReplyKind::Acknowledgement, None) if !outcome.attempted => "not_attempted",
        (ReplyKind::Acknowledgement, None) => "transport_error",
    }
}
