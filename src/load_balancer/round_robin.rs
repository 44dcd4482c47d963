//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::backend::{Backend, BackendError};

/// Ordered, immutable backends for one tenant plus a rotation cursor.
///
/// Selection is `backends[cursor % n]` where the cursor is bumped with a
/// single `fetch_add`, so concurrent callers never share or skip an index.
/// There is no health awareness: a failing backend keeps its turn.
#[derive(Debug)]
pub struct BackendSet {
    backends: Vec<Backend>,
    counter: AtomicUsize,
}

impl BackendSet {
    /// Create a set from already-parsed backends. Must be non-empty.
    pub fn new(backends: Vec<Backend>) -> Self {
        debug_assert!(!backends.is_empty(), "BackendSet requires at least one backend");
        Self {
            backends,
            counter: AtomicUsize::new(0),
        }
    }

    /// Parse every URL, failing on the first invalid one.
    pub fn parse<S: AsRef<str>>(urls: &[S]) -> Result<Self, (String, BackendError)> {
        let backends = urls
            .iter()
            .map(|raw| Backend::parse(raw.as_ref()).map_err(|e| (raw.as_ref().to_string(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(backends))
    }

    /// Select the next backend in the cycle.
    pub fn next(&self) -> &Backend {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        &self.backends[index % self.backends.len()]
    }

    /// All backends, in configured order.
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }
}
