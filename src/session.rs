//! One signed-in session: its cache, its engine and the user-facing calls
//! built on top of them.
//!
//! Each session owns exactly one [`TabCache`]; ending the session clears it.

use crate::actions::{self, TabAction};
use crate::error::{ApiError, SyncError};
use crate::remote::PadApi;
use crate::sync::{EngineOptions, MutationOutcome, SyncEngine, SyncEvent};
use crate::tab::{SharingPolicy, Tab, TabCache, TabId, TabState, is_temporary_id};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Document content of a pad.
#[derive(Debug, Clone, PartialEq)]
pub enum PadContent {
    /// The pad is not known to the server yet; start from an empty drawing
    Initial,
    /// The stored document, as returned by the server
    Document(serde_json::Value),
}

impl PadContent {
    /// The document as JSON; [`PadContent::Initial`] becomes an empty scene.
    pub fn into_document(self) -> serde_json::Value {
        match self {
            PadContent::Initial => serde_json::json!({
                "elements": [],
                "appState": {},
                "files": {},
            }),
            PadContent::Document(value) => value,
        }
    }
}

/// Result of [`PadSession::perform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The mutation behind the action committed
    Applied,
    /// The tab was already gone; nothing was sent
    AlreadySettled,
    /// Link produced by [`TabAction::CopyUrl`]
    Url(String),
    /// The action needs a value from the user first (a new name for rename)
    NeedsInput,
}

impl From<MutationOutcome<()>> for ActionOutcome {
    fn from(outcome: MutationOutcome<()>) -> Self {
        match outcome {
            MutationOutcome::Committed(()) => ActionOutcome::Applied,
            MutationOutcome::AlreadySettled => ActionOutcome::AlreadySettled,
        }
    }
}

pub struct PadSession<A> {
    engine: SyncEngine<A>,
    origin: String,
}

impl<A: PadApi> PadSession<A> {
    /// `origin` is the server origin used for shareable links.
    pub fn new(api: A, options: EngineOptions, origin: impl Into<String>) -> Self {
        Self {
            engine: SyncEngine::new(api, Arc::new(TabCache::new()), options),
            origin: origin.into(),
        }
    }

    pub fn engine(&self) -> &SyncEngine<A> {
        &self.engine
    }

    /// Initial load of the user's pads.
    pub async fn start(&self) -> Result<(), ApiError> {
        let applied = self.engine.load().await?;
        log::info!(
            "Session started with {} pads (applied: {})",
            self.engine.cache().collection().len(),
            applied
        );
        Ok(())
    }

    /// Drop all session state. Fetches and mutations still in flight are
    /// kept out of the cache when they land.
    pub fn end(&self) {
        self.engine.end_session();
        log::info!("Session ended");
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.engine.cache().collection().tabs().to_vec()
    }

    pub fn state(&self) -> TabState {
        self.engine.cache().read()
    }

    /// The selected tab, falling back to the server's active tab when the
    /// session has not chosen one.
    pub fn selected_tab_id(&self) -> Option<TabId> {
        self.engine.cache().read().effective_selection().cloned()
    }

    /// Select `id` as the user's in-session choice. Returns false, leaving
    /// the selection alone, if `id` is not in the collection.
    pub fn select_tab(&self, id: &str) -> bool {
        self.engine.cache().patch(|state| {
            if !state.collection.contains(id) {
                return false;
            }
            state.selected = Some(id.to_string());
            true
        })
    }

    /// Load a pad's document. Temporary pads are not known to the server, so
    /// they get [`PadContent::Initial`] without a request.
    pub async fn load_pad_content(&self, id: &str) -> Result<PadContent, ApiError> {
        if is_temporary_id(id) {
            log::debug!("Pad {} is temporary, using initial content", id);
            return Ok(PadContent::Initial);
        }
        let document = self.engine.api().fetch_pad_content(id).await?;
        Ok(PadContent::Document(document))
    }

    /// Actions `user_id` may take on `id`; empty if the tab is unknown.
    pub fn actions_for(&self, id: &str, user_id: &str) -> Vec<TabAction> {
        self.engine
            .cache()
            .read()
            .collection
            .get(id)
            .map(|tab| actions::available_actions(tab, user_id))
            .unwrap_or_default()
    }

    /// Run `action` on `id`. `new_name` is only used by rename.
    pub async fn perform(
        &self,
        id: &str,
        action: TabAction,
        new_name: Option<&str>,
    ) -> Result<ActionOutcome, SyncError> {
        log::debug!("Performing {:?} on {}", action, id);
        match action {
            TabAction::Rename => match new_name.map(str::trim) {
                Some(name) if !name.is_empty() => {
                    Ok(self.engine.rename_pad(id, name).await?.into())
                }
                _ => Ok(ActionOutcome::NeedsInput),
            },
            TabAction::CopyUrl => Ok(ActionOutcome::Url(actions::pad_url(&self.origin, id))),
            TabAction::ToggleSharing => Ok(self.toggle_sharing(id).await?.into()),
            TabAction::Delete => Ok(self.engine.delete_pad(id).await?.into()),
            TabAction::Leave => Ok(self.engine.leave_pad(id).await?.into()),
        }
    }

    pub async fn create_pad(&self) -> Result<Tab, SyncError> {
        self.engine.create_pad().await
    }

    pub async fn rename_pad(
        &self,
        id: &str,
        new_name: &str,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.engine.rename_pad(id, new_name).await
    }

    pub async fn delete_pad(&self, id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.engine.delete_pad(id).await
    }

    pub async fn leave_pad(&self, id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.engine.leave_pad(id).await
    }

    pub async fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.engine.update_sharing_policy(id, policy).await
    }

    /// Flip a pad between public and private.
    pub async fn toggle_sharing(&self, id: &str) -> Result<MutationOutcome<()>, SyncError> {
        let current = self
            .engine
            .cache()
            .read()
            .collection
            .get(id)
            .map(|tab| tab.sharing_policy);
        match current {
            Some(policy) => {
                self.engine
                    .update_sharing_policy(id, actions::toggled_policy(policy))
                    .await
            }
            None => Ok(MutationOutcome::AlreadySettled),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    /// Wait for outstanding reconciliation fetches.
    pub async fn wait_idle(&self) {
        self.engine.wait_idle().await;
    }
}
