//! Configuration file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::{parse_config, ConfigError};
use crate::config::store::ConfigStore;
use crate::observability::metrics;
use crate::routing::RoutingSnapshot;

/// Sends a reload request.
pub type ReloadTrigger = mpsc::UnboundedSender<()>;

/// A watcher that monitors the configuration file for changes.
///
/// The parent directory is watched so that editors which save by renaming a
/// temporary file over the original still produce events.
pub struct ConfigWatcher {
    path: PathBuf,
    trigger_tx: ReloadTrigger,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver of reload requests.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                trigger_tx,
            },
            trigger_rx,
        )
    }

    /// A sender that can request reloads from elsewhere (e.g. SIGHUP).
    pub fn trigger(&self) -> ReloadTrigger {
        self.trigger_tx.clone()
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.trigger_tx;
        let file_name: Option<OsString> = self.path.file_name().map(|n| n.to_os_string());
        let watch_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if ours {
                        tracing::debug!(kind = ?event.kind, "Config file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Rebuilds and publishes snapshots when asked to.
pub struct Reloader {
    path: PathBuf,
    store: Arc<ConfigStore>,
}

impl Reloader {
    pub fn new(path: impl Into<PathBuf>, store: Arc<ConfigStore>) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    /// Re-read, validate, build and publish. On error the current snapshot
    /// is left in place.
    pub async fn reload(&self) -> Result<u64, ConfigError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let config = parse_config(&content)?;
        let snapshot = RoutingSnapshot::build(config)?;
        Ok(self.store.publish(snapshot))
    }

    /// Serve reload requests until shutdown or until every trigger sender
    /// is gone. Bursts of requests collapse into one reload.
    pub async fn run(self, mut triggers: mpsc::UnboundedReceiver<()>, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                trigger = triggers.recv() => {
                    if trigger.is_none() {
                        tracing::info!("Reload channel closed, reloader exiting");
                        break;
                    }
                    while triggers.try_recv().is_ok() {}
                    self.reload_and_log().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reloader received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn reload_and_log(&self) {
        tracing::info!(path = ?self.path, "Reloading config...");
        match self.reload().await {
            Ok(generation) => {
                metrics::record_reload(true);
                tracing::info!(generation, "Config reloaded");
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    error = %e,
                    generation = self.store.current().generation(),
                    "Failed to reload config. Keeping current configuration."
                );
            }
        }
    }
}
