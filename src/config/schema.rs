//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener, TLS and CDN settings.
    pub global: GlobalConfig,

    /// Tenants in declaration order.
    #[serde(deserialize_with = "deserialize_apps")]
    pub apps: Vec<AppConfig>,
}

/// Process-wide settings from the `[global]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Listen address (e.g. ":8080" or "0.0.0.0:8080").
    pub listen_port: String,

    /// Path to certificate file (PEM). HTTPS only when both paths are set.
    pub tls_cert_path: String,

    /// Path to private key file (PEM).
    pub tls_key_path: String,

    /// Listen address of the static file server. Empty disables it.
    pub cdn_port: String,

    /// Root directory served by the static file server.
    pub cdn_root: String,

    /// Reserved. Parsed but not enforced.
    pub max_queue_size: Option<u64>,

    /// Prometheus exporter bind address. Empty disables metrics export.
    pub metrics_address: String,

    /// Largest request body accepted, in bytes. Unset means no limit.
    pub max_body_size: Option<usize>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            listen_port: ":8080".to_string(),
            tls_cert_path: String::new(),
            tls_key_path: String::new(),
            cdn_port: String::new(),
            cdn_root: "./cdn".to_string(),
            max_queue_size: None,
            metrics_address: String::new(),
            max_body_size: None,
        }
    }
}

impl GlobalConfig {
    /// Returns the certificate and key paths when TLS is fully configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        if self.tls_cert_path.is_empty() || self.tls_key_path.is_empty() {
            None
        } else {
            Some((&self.tls_cert_path, &self.tls_key_path))
        }
    }

    /// True when exactly one of the TLS paths is set.
    pub fn tls_half_configured(&self) -> bool {
        self.tls_cert_path.is_empty() != self.tls_key_path.is_empty()
    }
}

/// One tenant from an `[apps.<name>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Table key. Filled in from the map key, never read from the table body.
    #[serde(skip)]
    pub name: String,

    /// Glob pattern matched against the Host header.
    pub server_name: String,

    /// Ordered backend base URLs.
    pub backends: Vec<String>,

    /// Maximum concurrently running requests (C).
    pub max_requests: usize,

    /// Maximum requests waiting for a running slot (Q).
    pub queue_size: usize,

    /// Backend selection strategy.
    #[serde(default)]
    pub load_balance: LoadBalance,

    /// Log gate occupancy on every admit and release.
    #[serde(default)]
    pub debug: bool,
}

/// Backend selection strategy. Round robin is the only one defined.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalance {
    #[default]
    RoundRobin,
}

impl fmt::Display for LoadBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalance::RoundRobin => f.write_str("round_robin"),
        }
    }
}

/// Decodes the `[apps]` table into a vector, keeping document order and
/// moving each table key into `AppConfig::name`.
fn deserialize_apps<'de, D>(deserializer: D) -> Result<Vec<AppConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AppsVisitor;

    impl<'de> Visitor<'de> for AppsVisitor {
        type Value = Vec<AppConfig>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of apps keyed by name")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut apps = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, mut app)) = map.next_entry::<String, AppConfig>()? {
                app.name = name;
                apps.push(app);
            }
            Ok(apps)
        }
    }

    deserializer.deserialize_map(AppsVisitor)
}
