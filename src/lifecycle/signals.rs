//! OS signal handling.
//!
//! SIGHUP requests a config reload through the same channel as the file
//! watcher. SIGTERM and SIGINT are handled in `shutdown`.

use tokio::sync::broadcast;

use crate::config::watcher::ReloadTrigger;

/// Forward SIGHUP to `trigger` until shutdown.
#[cfg(unix)]
pub async fn forward_sighup(trigger: ReloadTrigger, mut shutdown: broadcast::Receiver<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for SIGHUP");
            return;
        }
    };

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("Received SIGHUP, requesting reload");
                if trigger.send(()).is_err() {
                    break;
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(not(unix))]
pub async fn forward_sighup(_trigger: ReloadTrigger, mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
}
