//! Shared utilities for relay integration tests.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhook_relay::config::{RelayConfig, TargetStrategy};
use webhook_relay::http::AppState;
use webhook_relay::{HttpServer, Shutdown};

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

/// Start a mock backend that always answers 200 with `response`.
pub async fn start_mock_backend(response: &'static str) -> MockBackend {
    start_programmable_backend(move |_| async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every request is recorded before `f` decides the reply.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorder = captured.clone();
    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let f = f.clone();
            let recorder = recorder.clone();
            async move {
                let request = CapturedRequest {
                    method,
                    path: uri.path().to_string(),
                    headers,
                    body,
                };
                recorder.lock().unwrap().push(request.clone());
                let (status, body) = f(request).await;
                (StatusCode::from_u16(status).unwrap(), body)
            }
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, captured }
}

/// A port nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running relay bound to an ephemeral port.
pub struct RelayHandle {
    pub addr: SocketAddr,
    pub state: AppState,
    pub config_updates: mpsc::UnboundedSender<RelayConfig>,
    shutdown: Shutdown,
}

impl RelayHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(config: RelayConfig) -> RelayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let state = server.state().clone();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    RelayHandle {
        addr,
        state,
        config_updates,
        shutdown,
    }
}

/// Config pointing at `backend_url` with the target record and diagnostics under `dir`.
pub fn relay_config(backend_url: &str, dir: &Path) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.target.strategy = TargetStrategy::Persisted;
    config.target.default_url = backend_url.to_string();
    config.target.state_path = dir.join("webhook_config.json").display().to_string();
    config.diagnostics.log_path = Some(dir.join("webhook.log").display().to_string());
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
