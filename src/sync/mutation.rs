//! Per-kind mutation policies.
//!
//! Each mutation says how to speculate on the local state, which remote
//! call to make, and how to commit or undo once that call settles. The
//! engine in [`super`] drives them all through the same lifecycle.
//!
//! Undo is scoped to the mutation's own tab (and the selection, if this
//! mutation moved it), so an unrelated mutation that committed in the
//! meantime is never reverted. With nothing else in flight it restores the
//! snapshot exactly.
//!
//! Removing the selected tab moves the selection to a neighbour. The
//! collection's active tab only moves when it was the removed one, and the
//! selection takes precedence when both are set.

use super::events::SyncEvent;
use crate::error::{ApiError, StateConflict};
use crate::remote::PadApi;
use crate::tab::selection;
use crate::tab::{SharingPolicy, Tab, TabId, TabState, now_timestamp};
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Rename,
    Delete,
    Leave,
    UpdateSharingPolicy,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Create => "create",
            MutationKind::Rename => "rename",
            MutationKind::Delete => "delete",
            MutationKind::Leave => "leave",
            MutationKind::UpdateSharingPolicy => "update sharing policy",
        };
        f.write_str(name)
    }
}

pub(crate) trait Mutation: Send + Sync + 'static {
    /// What the remote call returns on success
    type Payload: Send + 'static;
    /// What the caller gets once committed
    type Output: Send + 'static;

    fn kind(&self) -> MutationKind;

    /// Tab id this mutation serializes on
    fn target(&self) -> &str;

    /// Apply the intended effect locally. Fails without touching `state`
    /// if the target is not present.
    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict>;

    fn send<A: PadApi>(
        &self,
        api: &A,
    ) -> impl Future<Output = Result<Self::Payload, ApiError>> + Send;

    /// Finalize after the remote call succeeded.
    fn commit(
        &self,
        state: &mut TabState,
        snapshot: &TabState,
        payload: Self::Payload,
    ) -> (Self::Output, SyncEvent);

    /// Undo the speculative effect after the remote call failed.
    fn rollback(&self, state: &mut TabState, snapshot: &TabState);
}

pub(crate) struct CreatePad {
    pub temp_id: TabId,
    pub title: String,
}

impl Mutation for CreatePad {
    type Payload = Tab;
    type Output = Tab;

    fn kind(&self) -> MutationKind {
        MutationKind::Create
    }

    fn target(&self) -> &str {
        &self.temp_id
    }

    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict> {
        state
            .collection
            .push(Tab::placeholder(self.temp_id.clone(), &self.title));
        if state.collection.active_tab_id().is_none() {
            state
                .collection
                .set_active_tab_id(Some(self.temp_id.clone()));
        }
        state.selected = Some(self.temp_id.clone());
        Ok(())
    }

    fn send<A: PadApi>(&self, api: &A) -> impl Future<Output = Result<Tab, ApiError>> + Send {
        api.create_pad()
    }

    fn commit(&self, state: &mut TabState, _snapshot: &TabState, tab: Tab) -> (Tab, SyncEvent) {
        if !state.collection.replace_in_place(&self.temp_id, tab.clone()) {
            state.collection.push(tab.clone());
        }
        if state.selected.as_deref() == Some(self.temp_id.as_str()) {
            state.selected = Some(tab.id.clone());
        }
        if state.collection.active_tab_id().map(String::as_str) == Some(self.temp_id.as_str()) {
            state.collection.set_active_tab_id(Some(tab.id.clone()));
        }
        let event = SyncEvent::Created {
            temp_id: self.temp_id.clone(),
            tab: tab.clone(),
        };
        (tab, event)
    }

    fn rollback(&self, state: &mut TabState, snapshot: &TabState) {
        state.collection.remove(&self.temp_id);
        if state.collection.active_tab_id().map(String::as_str) == Some(self.temp_id.as_str()) {
            state
                .collection
                .set_active_tab_id(snapshot.collection.active_tab_id().cloned());
        }
        if state.selected.as_deref() == Some(self.temp_id.as_str()) {
            state.selected =
                selection::select_after_failed_create(&snapshot.collection, &state.collection);
        }
    }
}

pub(crate) struct RenamePad {
    pub id: TabId,
    pub new_name: String,
}

impl Mutation for RenamePad {
    type Payload = ();
    type Output = ();

    fn kind(&self) -> MutationKind {
        MutationKind::Rename
    }

    fn target(&self) -> &str {
        &self.id
    }

    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict> {
        let tab = state.collection.get_mut(&self.id).ok_or_else(|| StateConflict {
            id: self.id.clone(),
        })?;
        tab.title = self.new_name.clone();
        tab.updated_at = now_timestamp();
        Ok(())
    }

    fn send<A: PadApi>(&self, api: &A) -> impl Future<Output = Result<(), ApiError>> + Send {
        api.rename_pad(&self.id, &self.new_name)
    }

    fn commit(&self, _state: &mut TabState, _snapshot: &TabState, _: ()) -> ((), SyncEvent) {
        let event = SyncEvent::Renamed {
            id: self.id.clone(),
            title: self.new_name.clone(),
        };
        ((), event)
    }

    fn rollback(&self, state: &mut TabState, snapshot: &TabState) {
        if let (Some(tab), Some(before)) = (
            state.collection.get_mut(&self.id),
            snapshot.collection.get(&self.id),
        ) {
            tab.title = before.title.clone();
            tab.updated_at = before.updated_at.clone();
        }
    }
}

pub(crate) struct UpdateSharingPolicy {
    pub id: TabId,
    pub policy: SharingPolicy,
}

impl Mutation for UpdateSharingPolicy {
    type Payload = ();
    type Output = ();

    fn kind(&self) -> MutationKind {
        MutationKind::UpdateSharingPolicy
    }

    fn target(&self) -> &str {
        &self.id
    }

    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict> {
        let tab = state.collection.get_mut(&self.id).ok_or_else(|| StateConflict {
            id: self.id.clone(),
        })?;
        tab.sharing_policy = self.policy;
        tab.updated_at = now_timestamp();
        Ok(())
    }

    fn send<A: PadApi>(&self, api: &A) -> impl Future<Output = Result<(), ApiError>> + Send {
        api.update_sharing_policy(&self.id, self.policy)
    }

    fn commit(&self, _state: &mut TabState, _snapshot: &TabState, _: ()) -> ((), SyncEvent) {
        let event = SyncEvent::SharingChanged {
            id: self.id.clone(),
            policy: self.policy,
        };
        ((), event)
    }

    fn rollback(&self, state: &mut TabState, snapshot: &TabState) {
        if let (Some(tab), Some(before)) = (
            state.collection.get_mut(&self.id),
            snapshot.collection.get(&self.id),
        ) {
            tab.sharing_policy = before.sharing_policy;
            tab.updated_at = before.updated_at.clone();
        }
    }
}

/// Remove `id`, moving the selection to its left neighbour if it was
/// selected.
fn remove_speculatively(state: &mut TabState, id: &str) -> Result<(), StateConflict> {
    let (index, _) = state.collection.remove(id).ok_or_else(|| StateConflict {
        id: id.to_string(),
    })?;
    if state.selected.as_deref() == Some(id) {
        state.selected = selection::select_after_removal(&state.collection, index);
    }
    if state.collection.active_tab_id().map(String::as_str) == Some(id) {
        let next = state.selected.clone();
        state.collection.set_active_tab_id(next);
    }
    Ok(())
}

/// Put a speculatively removed tab back at its former index (clamped) and
/// hand the selection back if it had been on that tab.
fn restore_removed(state: &mut TabState, snapshot: &TabState, id: &str) {
    let Some(index) = snapshot.collection.position(id) else {
        return;
    };
    if let Some(tab) = snapshot.collection.get(id) {
        state.collection.insert_at(index, tab.clone());
    }
    if snapshot.selected.as_deref() == Some(id) {
        state.selected = Some(id.to_string());
    }
    if snapshot.collection.active_tab_id().map(String::as_str) == Some(id) {
        state.collection.set_active_tab_id(Some(id.to_string()));
    }
}

pub(crate) struct DeletePad {
    pub id: TabId,
}

impl Mutation for DeletePad {
    type Payload = ();
    type Output = ();

    fn kind(&self) -> MutationKind {
        MutationKind::Delete
    }

    fn target(&self) -> &str {
        &self.id
    }

    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict> {
        remove_speculatively(state, &self.id)
    }

    fn send<A: PadApi>(&self, api: &A) -> impl Future<Output = Result<(), ApiError>> + Send {
        api.delete_pad(&self.id)
    }

    fn commit(&self, _state: &mut TabState, _snapshot: &TabState, _: ()) -> ((), SyncEvent) {
        ((), SyncEvent::Deleted { id: self.id.clone() })
    }

    fn rollback(&self, state: &mut TabState, snapshot: &TabState) {
        restore_removed(state, snapshot, &self.id);
    }
}

pub(crate) struct LeavePad {
    pub id: TabId,
}

impl Mutation for LeavePad {
    type Payload = ();
    type Output = ();

    fn kind(&self) -> MutationKind {
        MutationKind::Leave
    }

    fn target(&self) -> &str {
        &self.id
    }

    fn speculate(&self, state: &mut TabState) -> Result<(), StateConflict> {
        remove_speculatively(state, &self.id)
    }

    fn send<A: PadApi>(&self, api: &A) -> impl Future<Output = Result<(), ApiError>> + Send {
        api.leave_pad(&self.id)
    }

    fn commit(&self, _state: &mut TabState, snapshot: &TabState, _: ()) -> ((), SyncEvent) {
        let title = snapshot
            .collection
            .get(&self.id)
            .map(|t| t.title.clone())
            .unwrap_or_default();
        ((), SyncEvent::Left {
            id: self.id.clone(),
            title,
        })
    }

    fn rollback(&self, state: &mut TabState, snapshot: &TabState) {
        restore_removed(state, snapshot, &self.id);
    }
}
