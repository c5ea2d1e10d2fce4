//! Hot reload of the relay configuration file.
//!
//! The parent directory is watched rather than the file itself, so editors
//! and deploy tools that replace the file by rename keep triggering reloads.
//! A reload is forwarded only when the file parses, validates, and differs
//! from the configuration last forwarded.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// What a single reload attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    Applied,
    Unchanged,
    Rejected,
}

/// Watches the configuration file and sends validated changes downstream.
pub struct ConfigWatcher {
    reloader: Reloader,
}

impl ConfigWatcher {
    /// `current` is the configuration the server was started with.
    pub fn new(
        path: &Path,
        current: RelayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            last_applied: current,
            update_tx,
        };
        (Self { reloader }, update_rx)
    }

    /// Start watching in notify's background thread.
    ///
    /// Reloads stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let mut reloader = self.reloader;
        let path = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    reloader.on_event(&event);
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&watch_dir(&path), RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last_applied: RelayConfig,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl Reloader {
    fn on_event(&mut self, event: &Event) -> Option<Reload> {
        if !(event.kind.is_modify() || event.kind.is_create()) {
            return None;
        }
        let name = self.path.file_name()?;
        if !event.paths.iter().any(|p| p.file_name() == Some(name)) {
            return None;
        }
        Some(self.reload())
    }

    fn reload(&mut self) -> Reload {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                return Reload::Rejected;
            }
        };

        // notify reports several events per save.
        if config == self.last_applied {
            tracing::debug!(path = ?self.path, "Config file touched without changes");
            return Reload::Unchanged;
        }

        tracing::info!(path = ?self.path, "Config file changed, reloading");
        self.last_applied = config.clone();
        let _ = self.update_tx.send(config);
        Reload::Applied
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
