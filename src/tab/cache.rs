//! The session's in-memory mirror of the server's pad collection.
//!
//! One `TabCache` exists per signed-in session. All reads return a snapshot;
//! all writes go through [`TabCache::patch`], which runs the closure to
//! completion under the lock, so concurrent mutations never observe each
//! other's half-applied patches.

use super::selection;
use super::{TabCollection, TabId};
use parking_lot::Mutex;

/// Everything the UI shows: the collection plus the selected tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabState {
    pub collection: TabCollection,
    /// The session selection; `None` means unset
    pub selected: Option<TabId>,
}

impl TabState {
    pub fn new(collection: TabCollection, selected: Option<TabId>) -> Self {
        Self {
            collection,
            selected,
        }
    }

    /// Whether the selection agrees with membership: a member id when the
    /// collection is non-empty, unset when it is empty.
    pub fn selection_is_consistent(&self) -> bool {
        match &self.selected {
            Some(id) => self.collection.contains(id),
            None => self.collection.is_empty(),
        }
    }

    /// Selection with the server's active tab as fallback when unset
    pub fn effective_selection(&self) -> Option<&TabId> {
        self.selected
            .as_ref()
            .or_else(|| self.collection.active_tab_id())
    }
}

/// Lock-protected [`TabState`].
#[derive(Debug, Default)]
pub struct TabCache {
    state: Mutex<TabState>,
}

impl TabCache {
    /// Create an empty cache (no tabs, nothing selected)
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state
    pub fn read(&self) -> TabState {
        self.state.lock().clone()
    }

    /// Snapshot of the current collection
    pub fn collection(&self) -> TabCollection {
        self.state.lock().collection.clone()
    }

    pub fn selected(&self) -> Option<TabId> {
        self.state.lock().selected.clone()
    }

    /// Replace the collection after a full fetch.
    ///
    /// The selection is kept while it is still valid; otherwise it is
    /// re-derived from the new membership.
    pub fn replace(&self, collection: TabCollection) {
        self.patch(|state| {
            state.collection = collection;
            selection::reselect_if_stale(state);
        });
    }

    /// Apply `f` atomically to the latest state and return its result.
    ///
    /// The lock is held only for the duration of `f`; never await inside it.
    pub fn patch<R>(&self, f: impl FnOnce(&mut TabState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }
}
