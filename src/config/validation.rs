//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (admission limits fit a semaphore)
//! - Check tenants are routable (pattern and backends present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Pattern compilation and URL parsing happen when the snapshot is built

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no apps configured")]
    NoApps,

    #[error("app '{app}': server_name must not be empty")]
    EmptyServerName { app: String },

    #[error("app '{app}': backends must not be empty")]
    NoBackends { app: String },

    #[error("app '{app}': {field} = {value} exceeds the maximum of {max}")]
    LimitTooLarge {
        app: String,
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("app '{app}' is declared more than once")]
    DuplicateApp { app: String },
}

/// Validate a decoded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    if config.global.tls_half_configured() {
        tracing::warn!(
            cert = %config.global.tls_cert_path,
            key = %config.global.tls_key_path,
            "Only one of tls_cert_path/tls_key_path is set; serving plain HTTP"
        );
    }

    if config.apps.is_empty() {
        errors.push(ValidationError::NoApps);
    }

    for app in &config.apps {
        if !seen.insert(app.name.as_str()) {
            errors.push(ValidationError::DuplicateApp { app: app.name.clone() });
        }
        if app.server_name.trim().is_empty() {
            errors.push(ValidationError::EmptyServerName { app: app.name.clone() });
        }
        if app.backends.is_empty() {
            errors.push(ValidationError::NoBackends { app: app.name.clone() });
        }
        for (field, value) in [("max_requests", app.max_requests), ("queue_size", app.queue_size)] {
            if value > Semaphore::MAX_PERMITS {
                errors.push(ValidationError::LimitTooLarge {
                    app: app.name.clone(),
                    field,
                    value,
                    max: Semaphore::MAX_PERMITS,
                });
            }
        }
        if app.queue_size == 0 {
            tracing::warn!(app = %app.name, "queue_size = 0: every request for this app is rejected");
        }
        if app.max_requests == 0 {
            tracing::warn!(app = %app.name, "max_requests = 0: requests for this app can never run");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
