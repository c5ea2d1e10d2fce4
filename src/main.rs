//! Telegram Webhook Relay
//!
//! Receives webhook calls from the messaging platform and re-emits them to the
//! bot backend, always acknowledging the platform with 200.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                      WEBHOOK RELAY                        │
//!   Telegram      │  ┌────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐  │
//!   POST ─────────┼─▶│ http   │──▶│ capture │──▶│ target   │──▶│ dispatch │──┼──▶ Backend
//!                 │  │ server │   │ + hdrs  │   │ resolver │   │ (1 try)  │  │   /api/webhook
//!                 │  └────────┘   └─────────┘   └──────────┘   └────┬─────┘  │
//!   200 ◀─────────┼──────────────────── reconcile ◀──────────────────┘        │
//!                 │                                                          │
//!                 │  diagnostics (JSON lines)   admin (/admin/config)        │
//!                 │  config + hot reload        metrics / tracing            │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhook_relay::config::watcher::ConfigWatcher;
use webhook_relay::config::{load_config, RelayConfig, TargetStrategy};
use webhook_relay::lifecycle::signals::spawn_signal_listener;
use webhook_relay::net::tls::load_tls_config;
use webhook_relay::observability::{logging, metrics};
use webhook_relay::{HttpServer, RelayError, Shutdown};

#[derive(Parser)]
#[command(name = "webhook-relay")]
#[command(about = "Forward messaging-platform webhooks to a bot backend", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("webhook-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        webhook_path = %config.listener.webhook_path,
        strategy = ?config.target.strategy,
        default_url = %config.target.default_url,
        connect_timeout_secs = config.timeouts.connect_secs,
        request_timeout_secs = config.timeouts.request_secs,
        diagnostics = ?config.diagnostics.log_path,
        "Configuration loaded"
    );

    if config.upstream.skip_tls_verify_for_loopback {
        tracing::warn!("Certificate verification is disabled for loopback targets");
    }
    if config.target.strategy == TargetStrategy::Persisted && !config.admin.enabled {
        tracing::info!(
            state_path = %config.target.state_path,
            "Admin API disabled; the target record can only be changed on disk"
        );
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match (&args.config, args.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (updates, Some(watcher.run()?))
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let server = HttpServer::new(config.clone())?;

    match &config.listener.tls {
        Some(tls) => {
            let rustls = load_tls_config(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server
                .run_tls(addr, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for webhooks");
            server
                .run(listener, config_updates, shutdown.subscribe())
                .await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
