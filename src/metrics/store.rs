use std::sync::{Arc, PoisonError, RwLock};

use super::snapshot::MetricsSnapshot;

/// Holds the published snapshot. Readers clone the `Arc` once per query and keep reading that
/// snapshot even if a newer one is published meanwhile.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<MetricsSnapshot>>,
}

impl SnapshotStore {
    pub fn new(initial: MetricsSnapshot) -> SnapshotStore {
        SnapshotStore {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn current(&self) -> Arc<MetricsSnapshot> {
        // The lock only ever guards a complete `Arc`, so a poisoned lock is still consistent.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn publish(&self, snapshot: MetricsSnapshot) {
        let next = Arc::new(snapshot);
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };
        drop(previous);
    }
}
