//! Ordered collection of pad tabs.
//!
//! Order is the server-reported order; creates append. Every mutating method
//! keeps ids unique.

use super::{Tab, TabId};

/// Ordered, id-unique sequence of tabs plus the server's reported active tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabCollection {
    tabs: Vec<Tab>,
    active_tab_id: Option<TabId>,
}

impl TabCollection {
    /// Build a collection from server order. Later duplicates of an id are
    /// dropped so the uniqueness invariant holds even for a misbehaving server.
    pub fn new(tabs: Vec<Tab>, active_tab_id: Option<TabId>) -> Self {
        let mut collection = Self {
            tabs: Vec::with_capacity(tabs.len()),
            active_tab_id: None,
        };
        for tab in tabs {
            if collection.contains(&tab.id) {
                log::warn!("Dropping duplicate pad id {} from server listing", tab.id);
                continue;
            }
            collection.tabs.push(tab);
        }
        collection.active_tab_id = active_tab_id;
        collection
    }

    /// Get all tabs as a slice
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    /// Get the number of tabs
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tabs.iter().any(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    /// Tab at `index`, if any
    pub fn id_at(&self, index: usize) -> Option<&TabId> {
        self.tabs.get(index).map(|t| &t.id)
    }

    pub fn first_id(&self) -> Option<&TabId> {
        self.id_at(0)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TabId> {
        self.tabs.iter().map(|t| &t.id)
    }

    /// The active tab as reported by the server at load time
    pub fn active_tab_id(&self) -> Option<&TabId> {
        self.active_tab_id.as_ref()
    }

    pub fn set_active_tab_id(&mut self, id: Option<TabId>) {
        self.active_tab_id = id;
    }

    /// Append a tab. If the id is already present the existing record is
    /// replaced in place instead.
    pub fn push(&mut self, tab: Tab) {
        match self.get_mut(&tab.id) {
            Some(existing) => *existing = tab,
            None => self.tabs.push(tab),
        }
    }

    /// Insert a tab at `index` (clamped to `0..=len`). No-op if the id is
    /// already present.
    pub fn insert_at(&mut self, index: usize, tab: Tab) -> bool {
        if self.contains(&tab.id) {
            return false;
        }
        let clamped = index.min(self.tabs.len());
        self.tabs.insert(clamped, tab);
        true
    }

    /// Remove a tab by id, returning its former index and the record.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Tab)> {
        let idx = self.position(id)?;
        Some((idx, self.tabs.remove(idx)))
    }

    /// Replace the tab with id `old_id` by `tab`, keeping its position.
    ///
    /// If `tab.id` already exists elsewhere, the `old_id` record is removed
    /// instead so the id stays unique. Returns false if `old_id` is absent.
    pub fn replace_in_place(&mut self, old_id: &str, tab: Tab) -> bool {
        let Some(idx) = self.position(old_id) else {
            return false;
        };
        if tab.id != old_id && self.contains(&tab.id) {
            self.tabs.remove(idx);
            if let Some(existing) = self.get_mut(&tab.id) {
                *existing = tab;
            }
        } else {
            self.tabs[idx] = tab;
        }
        true
    }

    /// Whether every id appears exactly once
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.tabs.len());
        self.tabs.iter().all(|t| seen.insert(t.id.as_str()))
    }
}
