//! The process-wide current snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::routing::RoutingSnapshot;

/// Holds the active `RoutingSnapshot`.
///
/// Reads are lock-free loads of an `Arc`; a request keeps whatever it loaded
/// for as long as it needs it. Publishes are serialized by a mutex that
/// guards only the swap, never a read.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<RoutingSnapshot>,
    publish_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ConfigStore {
    /// Create the store from the initial snapshot (generation 1).
    pub fn new(mut initial: RoutingSnapshot) -> Self {
        initial.set_generation(1);
        Self {
            current: ArcSwap::from_pointee(initial),
            publish_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        }
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<RoutingSnapshot> {
        self.current.load_full()
    }

    /// Atomically replace the current snapshot. Returns its generation.
    pub fn publish(&self, mut snapshot: RoutingSnapshot) -> u64 {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        snapshot.set_generation(generation);

        let previous = self.current.load();
        if previous.global() != snapshot.global() {
            tracing::warn!(
                generation,
                "Global settings changed; listener, TLS and CDN changes apply after restart"
            );
        }

        self.current.store(Arc::new(snapshot));
        tracing::info!(
            generation,
            previous = previous.generation(),
            tenants = self.current.load().tenants().len(),
            "Routing snapshot published"
        );
        generation
    }
}
