//! Selection rules.
//!
//! Pure functions deciding which tab is selected whenever the collection
//! changes size or membership. After any of them runs, the selection is a
//! member id when the collection is non-empty and unset when it is empty.

use super::{TabCollection, TabId, TabState};

/// Re-derive the selection for a freshly loaded or externally changed
/// collection.
///
/// Precedence: the server's reported active tab if it is a member, else the
/// previous selection if still a member, else the first tab, else unset.
/// Calling it again with its own output as `previous` returns the same id.
pub fn derive_selection(
    previous: Option<&str>,
    collection: &TabCollection,
    server_active: Option<&str>,
) -> Option<TabId> {
    if let Some(active) = server_active
        && collection.contains(active)
    {
        return Some(active.to_string());
    }
    if let Some(previous) = previous
        && collection.contains(previous)
    {
        return Some(previous.to_string());
    }
    collection.first_id().cloned()
}

/// Re-derive the selection only if it no longer agrees with membership.
///
/// A valid in-session choice (e.g. a tab the user clicked) survives
/// reconciliation untouched. Returns true if the selection changed.
pub fn reselect_if_stale(state: &mut TabState) -> bool {
    if state.selection_is_consistent() {
        return false;
    }
    let next = derive_selection(
        state.selected.as_deref(),
        &state.collection,
        state.collection.active_tab_id().map(String::as_str),
    );
    log::debug!(
        "Selection {:?} is stale, reselecting {:?}",
        state.selected,
        next
    );
    state.selected = next;
    true
}

/// Selection after removing the tab that was at `removed_index`.
///
/// Picks the left neighbour (`max(0, removed_index - 1)` in the post-removal
/// collection), which is the first tab when index 0 was removed, or unset
/// when nothing remains.
pub fn select_after_removal(remaining: &TabCollection, removed_index: usize) -> Option<TabId> {
    if remaining.is_empty() {
        return None;
    }
    let idx = removed_index
        .saturating_sub(1)
        .min(remaining.len().saturating_sub(1));
    remaining.id_at(idx).cloned()
}

/// Selection after a failed create removed a placeholder that was selected.
///
/// Prefers the pre-create active tab, then the pre-create first tab, then
/// whatever is first now; only ids still present in `current` qualify.
pub fn select_after_failed_create(
    snapshot: &TabCollection,
    current: &TabCollection,
) -> Option<TabId> {
    snapshot
        .active_tab_id()
        .filter(|id| current.contains(id.as_str()))
        .or_else(|| snapshot.first_id().filter(|id| current.contains(id.as_str())))
        .or_else(|| current.first_id())
        .cloned()
}
