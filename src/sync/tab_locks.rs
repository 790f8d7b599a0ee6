//! Per-tab serialization of mutations.
//!
//! A mutation holds its tab's lock from speculation until settle, so two
//! mutations of the same tab never overlap. Different tabs never contend.
//! Entries are dropped once nobody holds or waits on them.

use crate::tab::TabId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct TabLocks {
    locks: Mutex<HashMap<TabId, Arc<AsyncMutex<()>>>>,
}

impl TabLocks {
    fn entry(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    /// Wait until `id` is free. Waiters are served in arrival order.
    pub async fn acquire(self: &Arc<Self>, id: &str) -> TabGuard {
        let guard = self.entry(id).lock_owned().await;
        TabGuard {
            locks: Arc::clone(self),
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Take `id` only if nobody holds it.
    pub fn try_acquire(self: &Arc<Self>, id: &str) -> Option<TabGuard> {
        let guard = self.entry(id).try_lock_owned().ok()?;
        Some(TabGuard {
            locks: Arc::clone(self),
            id: id.to_string(),
            guard: Some(guard),
        })
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.locks
            .lock()
            .get(id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of tabs with a holder or waiter
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one tab id.
#[derive(Debug)]
pub struct TabGuard {
    locks: Arc<TabLocks>,
    id: TabId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TabGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock();
        // Release first so the map's Arc is the only one left when idle
        self.guard.take();
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}
