//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the webhook and admin handlers
//! - Wire up middleware (request ID, tracing)
//! - Bind server to a plain or TLS listener
//! - Hand captured webhooks to the forwarding engine
//! - Swap engine state when a reloaded config arrives

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::relay::{ForwardingEngine, InboundRequest};

/// Everything a request needs, rebuilt as a unit on config reload.
#[derive(Debug)]
pub struct InnerState {
    pub config: RelayConfig,
    pub engine: ForwardingEngine,
}

impl InnerState {
    pub fn build(config: RelayConfig) -> Result<Self, RelayError> {
        let engine = ForwardingEngine::from_config(&config)?;
        Ok(Self { config, engine })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(InnerState::build(config)?)),
        })
    }

    /// Replace the live state with one built from `config`.
    ///
    /// On failure the current state stays in place.
    pub fn apply_config(&self, config: RelayConfig) {
        let current = self.inner.load();
        if current.config.listener != config.listener {
            tracing::warn!("Listener settings changed; restart required for them to take effect");
        }

        match InnerState::build(config) {
            Ok(next) => {
                self.inner.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to apply reloaded config, keeping current state"
                );
            }
        }
    }
}

/// HTTP server for the webhook relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let state = AppState::new(config.clone())?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.listener.webhook_path, post(webhook_handler))
            .merge(setup_admin_router(state.clone()))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_config_reloader(self.state.clone(), config_updates);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server behind TLS.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        // In-flight webhooks may wait out the full dispatch timeout.
        let grace = Duration::from_secs(self.state.inner.load().config.timeouts.request_secs + 5);
        spawn_config_reloader(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn spawn_config_reloader(state: AppState, mut updates: mpsc::UnboundedReceiver<RelayConfig>) {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            state.apply_config(config);
        }
    });
}

/// Webhook entry point: capture, relay, always answer 200.
async fn webhook_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let inner = state.inner.load_full();
    let request_id = request_id(request.headers());
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, inner.config.security.max_body_size).await {
        Ok(bytes) => {
            let inbound = InboundRequest::capture(parts.headers, bytes, request_id, client_addr);
            inner.engine.relay(inbound).await.into_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read webhook body");
            let inbound =
                InboundRequest::capture(parts.headers, Bytes::new(), request_id, client_addr);
            inner
                .engine
                .acknowledge_unreadable(inbound, e.to_string())
                .await
                .into_response()
        }
    }
}
