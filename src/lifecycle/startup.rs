//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the first routing snapshot and the store that holds it
//! - Start background tasks (metrics, watcher, reloader, SIGHUP, CDN)
//! - Bind the proxy listener and serve until shutdown

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{load_config, ConfigError, ConfigStore, ConfigWatcher, Reloader};
use crate::http::{cdn, HttpServer};
use crate::lifecycle::shutdown::{wait_for_signal, Shutdown};
use crate::lifecycle::signals::forward_sighup;
use crate::net::{bind, load_tls_config, resolve_listen_addr, ListenerError, TlsError};
use crate::observability::metrics;
use crate::routing::RoutingSnapshot;

/// Anything that stops the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("Failed to build backend client: {0}")]
    Client(#[from] rustls::Error),

    #[error("Failed to create CDN root {path:?}: {source}")]
    CdnRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the gateway from the config file at `config_path` until a shutdown
/// signal arrives.
pub async fn run(config_path: &Path) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    let global = config.global.clone();
    let snapshot = RoutingSnapshot::build(config)?;

    for tenant in snapshot.tenants() {
        tracing::info!(
            tenant = %tenant.name(),
            server_name = %tenant.matcher().pattern(),
            backends = tenant.backends().backends().len(),
            max_requests = tenant.gate().max_running(),
            queue_size = tenant.gate().max_queued(),
            load_balance = %tenant.load_balance(),
            "Tenant configured"
        );
    }

    let store = Arc::new(ConfigStore::new(snapshot));
    let shutdown = Shutdown::new();

    if !global.metrics_address.is_empty() {
        let addr = resolve_listen_addr(&global.metrics_address).await?;
        metrics::init_metrics(addr);
    }

    let (watcher, triggers) = ConfigWatcher::new(config_path);
    let trigger = watcher.trigger();
    // Dropping the watcher stops notifications.
    let _watch_guard = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start config watcher, reload only via SIGHUP");
            None
        }
    };

    tokio::spawn(Reloader::new(config_path, store.clone()).run(triggers, shutdown.subscribe()));
    tokio::spawn(forward_sighup(trigger, shutdown.subscribe()));

    if !global.cdn_port.is_empty() {
        let root = PathBuf::from(&global.cdn_root);
        std::fs::create_dir_all(&root).map_err(|source| StartupError::CdnRoot {
            path: root.clone(),
            source,
        })?;
        let listener = bind(&global.cdn_port).await?;
        let cdn_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = cdn::run(&root, listener, cdn_shutdown).await {
                tracing::error!(error = %e, "CDN server failed");
            }
        });
    }

    let server = HttpServer::new(store)?;
    let server_shutdown = shutdown.subscribe();

    let serve = async {
        match global.tls_paths() {
            Some((cert, key)) => {
                let tls = load_tls_config(Path::new(cert), Path::new(key)).await?;
                let addr = resolve_listen_addr(&global.listen_port).await?;
                server.run_tls(addr, tls, server_shutdown).await?;
            }
            None => {
                let listener = bind(&global.listen_port).await?;
                server.run(listener, server_shutdown).await?;
            }
        }
        Ok::<(), StartupError>(())
    };

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    serve.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
