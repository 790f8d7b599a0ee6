//! In-flight mutation bookkeeping.

use super::mutation::MutationKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of in-flight mutations per kind.
#[derive(Debug, Default)]
pub struct PendingCounts {
    counts: Mutex<HashMap<MutationKind, usize>>,
}

impl PendingCounts {
    /// Mark one mutation of `kind` as in flight until the guard drops.
    pub fn start(self: &Arc<Self>, kind: MutationKind) -> PendingGuard {
        *self.counts.lock().entry(kind).or_insert(0) += 1;
        PendingGuard {
            counts: Arc::clone(self),
            kind,
        }
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.counts.lock().get(&kind).is_some_and(|n| *n > 0)
    }

    /// Total in-flight mutations across all kinds
    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

/// Decrements its kind's count on drop.
#[derive(Debug)]
pub struct PendingGuard {
    counts: Arc<PendingCounts>,
    kind: MutationKind,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.counts.lock();
        if let Some(n) = counts.get_mut(&self.kind) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                counts.remove(&self.kind);
            }
        }
    }
}
