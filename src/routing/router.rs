//! Route lookup.
//!
//! # Responsibilities
//! - Build every tenant of one configuration into an immutable snapshot
//! - Look up the tenant for a Host value
//! - Return the matched tenant or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order, first match wins
//! - Shadowed tenants are reported at build time, not silently tolerated

use std::sync::Arc;

use crate::config::schema::{GatewayConfig, GlobalConfig};
use crate::config::ConfigError;
use crate::routing::tenant::TenantRuntime;

/// One fully built generation of routing and admission state.
#[derive(Debug)]
pub struct RoutingSnapshot {
    global: GlobalConfig,
    tenants: Vec<Arc<TenantRuntime>>,
    generation: u64,
}

impl RoutingSnapshot {
    /// Build every tenant; either all succeed or nothing is returned.
    pub fn build(config: GatewayConfig) -> Result<Self, ConfigError> {
        let tenants = config
            .apps
            .iter()
            .map(|app| TenantRuntime::build(app).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        report_shadowed(&tenants);

        Ok(Self {
            global: config.global,
            tenants,
            generation: 0,
        })
    }

    /// Find the first tenant whose pattern matches `host`.
    pub fn resolve(&self, host: &str) -> Option<&Arc<TenantRuntime>> {
        self.tenants.iter().find(|tenant| tenant.matcher().matches(host))
    }

    pub fn tenant(&self, name: &str) -> Option<&Arc<TenantRuntime>> {
        self.tenants.iter().find(|tenant| tenant.name() == name)
    }

    pub fn tenants(&self) -> &[Arc<TenantRuntime>] {
        &self.tenants
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// Publish sequence number; 0 until published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

fn report_shadowed(tenants: &[Arc<TenantRuntime>]) {
    for (index, later) in tenants.iter().enumerate() {
        let shadowed_by = tenants[..index].iter().find(|earlier| {
            earlier.matcher().pattern().eq_ignore_ascii_case(later.matcher().pattern())
                || (later.matcher().is_literal() && earlier.matcher().matches(later.matcher().pattern()))
        });
        if let Some(earlier) = shadowed_by {
            tracing::warn!(
                tenant = %later.name(),
                pattern = %later.matcher().pattern(),
                shadowed_by = %earlier.name(),
                "Tenant is unreachable: an earlier pattern always matches first"
            );
        }
    }
}
