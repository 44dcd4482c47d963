//! Per-tenant admission gate.
//!
//! # States
//! ```text
//! Idle ──reserve token──▶ Queued ──running slot──▶ Running ──permit dropped──▶ Done
//!   │                       │
//!   └─no token──▶ Rejected  └─abandon signal──▶ Abandoned
//! ```
//!
//! # Invariants
//! - At most `max_running` permits are ever outstanding
//! - At most `max_queued` requests hold a waiting token
//! - A request never blocks before it owns a waiting token, so arrivals past
//!   `max_running + max_queued` are rejected without waiting
//! - Both resources are RAII permits: every exit path (including a dropped
//!   future) gives them back

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Why a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Every waiting token was taken.
    #[error("wait queue is full")]
    QueueFull,
    /// The abandon signal fired while the request was queued.
    #[error("request abandoned while queued")]
    Abandoned,
}

/// Snapshot of gate usage, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub running: usize,
    pub queued: usize,
}

/// Bounded concurrency plus a bounded wait queue.
#[derive(Debug)]
pub struct AdmissionGate {
    tenant: Arc<str>,
    running: Arc<Semaphore>,
    waiting: Arc<Semaphore>,
    max_running: usize,
    max_queued: usize,
    debug: bool,
}

impl AdmissionGate {
    /// Create a gate allowing `max_running` concurrent and `max_queued`
    /// waiting requests. Both must be at most `Semaphore::MAX_PERMITS`.
    pub fn new(tenant: impl Into<Arc<str>>, max_running: usize, max_queued: usize) -> Self {
        Self {
            tenant: tenant.into(),
            running: Arc::new(Semaphore::new(max_running)),
            waiting: Arc::new(Semaphore::new(max_queued)),
            max_running,
            max_queued,
            debug: false,
        }
    }

    /// Log occupancy on every admit and release.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Admit a request, waiting as long as it takes for a running slot.
    pub async fn admit(self: &Arc<Self>) -> Result<RunningPermit, Rejection> {
        self.admit_or_abandon(std::future::pending::<()>()).await
    }

    /// Admit a request unless `abandon` resolves first.
    ///
    /// `abandon` is only polled while the request is queued. When it resolves
    /// the waiting token is returned and `Rejection::Abandoned` is reported.
    /// A client-disconnect or queue-timeout policy plugs in here.
    pub async fn admit_or_abandon<F>(self: &Arc<Self>, abandon: F) -> Result<RunningPermit, Rejection>
    where
        F: Future,
    {
        let waiting = match self.waiting.clone().try_acquire_owned() {
            Ok(token) => token,
            Err(_) => return Err(Rejection::QueueFull),
        };

        let slot = tokio::select! {
            biased;
            slot = self.running.clone().acquire_owned() => {
                // Never closed; treat a closed semaphore as no capacity.
                slot.map_err(|_| Rejection::QueueFull)?
            }
            _ = abandon => {
                drop(waiting);
                self.log_occupancy("abandoned");
                return Err(Rejection::Abandoned);
            }
        };
        drop(waiting);

        let permit = RunningPermit {
            _slot: slot,
            gate: Arc::clone(self),
        };
        self.log_occupancy("admitted");
        Ok(permit)
    }

    /// Current usage derived from available permits.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            running: self.max_running - self.running.available_permits(),
            queued: self.max_queued - self.waiting.available_permits(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn max_running(&self) -> usize {
        self.max_running
    }

    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    fn log_occupancy(&self, event: &'static str) {
        if self.debug {
            let occupancy = self.occupancy();
            tracing::info!(
                tenant = %self.tenant,
                event,
                running = occupancy.running,
                queued = occupancy.queued,
                "Gate occupancy"
            );
        }
    }
}

/// A held running slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct RunningPermit {
    _slot: OwnedSemaphorePermit,
    gate: Arc<AdmissionGate>,
}

impl RunningPermit {
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl Drop for RunningPermit {
    fn drop(&mut self) {
        if self.gate.debug {
            let occupancy = self.gate.occupancy();
            // `_slot` is released after this body runs.
            tracing::info!(
                tenant = %self.gate.tenant,
                event = "released",
                running = occupancy.running.saturating_sub(1),
                queued = occupancy.queued,
                "Gate occupancy"
            );
        }
    }
}
