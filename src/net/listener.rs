//! Listen address handling.
//!
//! # Responsibilities
//! - Accept Go-style ":8080" as well as "host:port"
//! - Resolve to a socket address
//! - Bind the TCP listener

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address did not resolve to anything usable.
    #[error("Invalid listen address {addr:?}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bare ":port" listens on every IPv4 interface.
fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    }
}

/// Resolve a configured listen address to the first socket address.
pub async fn resolve_listen_addr(raw: &str) -> Result<SocketAddr, ListenerError> {
    let normalized = normalize(raw);
    let resolve_err = |source| ListenerError::Resolve {
        addr: raw.to_string(),
        source,
    };

    let mut addrs = tokio::net::lookup_host(normalized).await.map_err(resolve_err)?;
    addrs
        .next()
        .ok_or_else(|| resolve_err(std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses")))
}

/// Resolve and bind.
pub async fn bind(raw: &str) -> Result<TcpListener, ListenerError> {
    let addr = resolve_listen_addr(raw).await?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %addr, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_port_only_binds_all_interfaces() {
        let addr = resolve_listen_addr(":8080").await.unwrap();
        assert_eq!(addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_explicit_host() {
        let addr = resolve_listen_addr("127.0.0.1:9000").await.unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        assert!(matches!(
            resolve_listen_addr("not an address").await,
            Err(ListenerError::Resolve { .. })
        ));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().unwrap().to_string();
        assert!(matches!(bind(&taken).await, Err(ListenerError::Bind { .. })));
    }
}
