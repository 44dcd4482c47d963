//! Runtime state for one configured app.

use std::sync::Arc;

use crate::admission::AdmissionGate;
use crate::config::schema::{AppConfig, LoadBalance};
use crate::config::validation::ValidationError;
use crate::config::ConfigError;
use crate::load_balancer::round_robin::BackendSet;
use crate::routing::matcher::HostMatcher;

/// Compiled matcher, backends and admission gate for a tenant.
///
/// Built wholesale from an `AppConfig` for every snapshot and never mutated
/// afterwards; only the cursor and gate counters move.
#[derive(Debug)]
pub struct TenantRuntime {
    name: Arc<str>,
    matcher: HostMatcher,
    backends: BackendSet,
    gate: Arc<AdmissionGate>,
    load_balance: LoadBalance,
}

impl TenantRuntime {
    /// Compile one tenant. Fails on an invalid pattern or backend URL.
    pub fn build(app: &AppConfig) -> Result<Self, ConfigError> {
        if app.backends.is_empty() {
            return Err(ConfigError::Validation(vec![ValidationError::NoBackends {
                app: app.name.clone(),
            }]));
        }

        let matcher = HostMatcher::compile(&app.server_name).map_err(|e| ConfigError::InvalidPattern {
            app: app.name.clone(),
            pattern: app.server_name.clone(),
            reason: e.to_string(),
        })?;

        let backends = BackendSet::parse(app.backends.as_slice()).map_err(|(url, e)| ConfigError::InvalidBackend {
            app: app.name.clone(),
            url,
            reason: e.to_string(),
        })?;

        let name: Arc<str> = Arc::from(app.name.as_str());
        let gate = AdmissionGate::new(name.clone(), app.max_requests, app.queue_size).with_debug(app.debug);

        Ok(Self {
            name,
            matcher,
            backends,
            gate: Arc::new(gate),
            load_balance: app.load_balance,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &HostMatcher {
        &self.matcher
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    pub fn load_balance(&self) -> LoadBalance {
        self.load_balance
    }
}
