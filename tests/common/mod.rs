//! Shared integration test helpers for padsync.
//!
//! Provides an in-memory pad server ([`FakePadApi`]) plus factory functions
//! for engines and sessions wired to it.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{FakePadApi, loaded_engine};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers is used per test file.

#![allow(dead_code)]

use padsync::remote::{PadApi, PadListing};
use padsync::sync::{EngineOptions, SyncEngine};
use padsync::{ApiError, PadOperation, PadSession, SharingPolicy, Tab, TabCache, TabState};
use padsync_config::SameTabPolicy;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// User id that owns every pad built by [`pad`].
pub const OWNER: &str = "owner-1";

/// A server-side pad record with fixed timestamps.
pub fn pad(id: &str, title: &str) -> Tab {
    Tab {
        id: id.to_string(),
        title: title.to_string(),
        owner_id: OWNER.to_string(),
        sharing_policy: SharingPolicy::Private,
        created_at: "2024-06-01T00:00:00Z".to_string(),
        updated_at: "2024-06-01T00:00:00Z".to_string(),
    }
}

/// How an injected failure behaves.
#[derive(Debug, Clone)]
struct Failure {
    error: ApiError,
    /// The server applies the change, but the client still sees the error
    /// (e.g. a response lost to a timeout)
    after_apply: bool,
}

#[derive(Default)]
struct FakeState {
    pads: Vec<Tab>,
    last_selected: Option<String>,
    next_id: u64,
    failures: HashMap<PadOperation, VecDeque<Failure>>,
    gates: HashMap<PadOperation, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<(PadOperation, String)>,
}

/// In-memory pad server.
///
/// Failures are injected per operation and consumed in order. A gate holds
/// the next call of an operation until its sender fires (or is dropped),
/// which lets tests choose the order in which responses arrive.
#[derive(Default)]
pub struct FakePadApi {
    state: Mutex<FakeState>,
}

impl FakePadApi {
    pub fn with_pads(pads: Vec<Tab>, last_selected: Option<&str>) -> Arc<Self> {
        let api = Self::default();
        {
            let mut state = api.state.lock();
            state.pads = pads;
            state.last_selected = last_selected.map(str::to_string);
        }
        Arc::new(api)
    }

    /// Server pads titled after their ids, e.g. `["a", "b"]`.
    pub fn with_ids(ids: &[&str]) -> Arc<Self> {
        Self::with_pads(ids.iter().map(|id| pad(id, id)).collect(), None)
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: PadOperation, error: ApiError) {
        self.push_failure(operation, error, false);
    }

    /// Make the next call of `operation` take effect on the server but
    /// report `error` to the client.
    pub fn fail_next_after_apply(&self, operation: PadOperation, error: ApiError) {
        self.push_failure(operation, error, true);
    }

    fn push_failure(&self, operation: PadOperation, error: ApiError, after_apply: bool) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(Failure { error, after_apply });
    }

    /// Hold the next call of `operation` until the returned sender fires.
    pub fn gate(&self, operation: PadOperation) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .gates
            .entry(operation)
            .or_default()
            .push_back(rx);
        tx
    }

    /// Server-side pads
    pub fn pads(&self) -> Vec<Tab> {
        self.state.lock().pads.clone()
    }

    pub fn pad_ids(&self) -> Vec<String> {
        self.state.lock().pads.iter().map(|p| p.id.clone()).collect()
    }

    /// Every call received, in arrival order
    pub fn calls(&self) -> Vec<(PadOperation, String)> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, operation: PadOperation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    /// Record the call and wait for its gate. Returns the injected failure,
    /// if any.
    async fn enter(&self, operation: PadOperation, target: &str) -> Option<Failure> {
        let (gate, failure) = {
            let mut state = self.state.lock();
            state.calls.push((operation, target.to_string()));
            let gate = state.gates.get_mut(&operation).and_then(VecDeque::pop_front);
            let failure = state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);
            (gate, failure)
        };
        if let Some(gate) = gate {
            // A dropped sender releases the call too
            let _ = gate.await;
        }
        failure
    }

    /// Apply `change` unless the failure says the server never saw it.
    fn settle<T>(
        &self,
        failure: Option<Failure>,
        change: impl FnOnce(&mut FakeState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        match failure {
            Some(Failure {
                error,
                after_apply: false,
            }) => Err(error),
            Some(Failure {
                error,
                after_apply: true,
            }) => {
                let _ = change(&mut *self.state.lock());
                Err(error)
            }
            None => change(&mut *self.state.lock()),
        }
    }
}

pub fn rejected(operation: PadOperation, status: u16, message: &str) -> ApiError {
    ApiError::Rejected {
        operation,
        status,
        message: message.to_string(),
    }
}

pub fn transport(operation: PadOperation) -> ApiError {
    ApiError::Transport {
        operation,
        message: "operation timed out".to_string(),
    }
}

fn not_found(operation: PadOperation) -> ApiError {
    rejected(operation, 404, "Pad not found")
}

fn find_pad<'a>(
    state: &'a mut FakeState,
    id: &str,
    operation: PadOperation,
) -> Result<&'a mut Tab, ApiError> {
    state
        .pads
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| not_found(operation))
}

impl PadApi for FakePadApi {
    async fn fetch_pads(&self) -> Result<PadListing, ApiError> {
        // Snapshot on arrival: a gated fetch answers with what the server
        // had when the request came in.
        let listing = {
            let state = self.state.lock();
            PadListing {
                tabs: state.pads.clone(),
                last_selected: state.last_selected.clone(),
            }
        };
        match self.enter(PadOperation::FetchPads, "").await {
            Some(failure) => Err(failure.error),
            None => Ok(listing),
        }
    }

    async fn create_pad(&self) -> Result<Tab, ApiError> {
        let failure = self.enter(PadOperation::CreatePad, "").await;
        self.settle(failure, |state| {
            state.next_id += 1;
            let tab = Tab {
                id: format!("srv-{}", state.next_id),
                title: "New pad".to_string(),
                owner_id: OWNER.to_string(),
                sharing_policy: SharingPolicy::Private,
                created_at: "2024-06-02T00:00:00Z".to_string(),
                updated_at: "2024-06-02T00:00:00Z".to_string(),
            };
            state.pads.push(tab.clone());
            Ok(tab)
        })
    }

    async fn rename_pad(&self, id: &str, new_name: &str) -> Result<(), ApiError> {
        let operation = PadOperation::RenamePad;
        let failure = self.enter(operation, id).await;
        self.settle(failure, |state| {
            let pad = find_pad(state, id, operation)?;
            pad.title = new_name.to_string();
            pad.updated_at = "2024-06-03T00:00:00Z".to_string();
            Ok(())
        })
    }

    async fn delete_pad(&self, id: &str) -> Result<(), ApiError> {
        let operation = PadOperation::DeletePad;
        let failure = self.enter(operation, id).await;
        self.settle(failure, |state| {
            find_pad(state, id, operation)?;
            state.pads.retain(|p| p.id != id);
            Ok(())
        })
    }

    async fn leave_pad(&self, id: &str) -> Result<(), ApiError> {
        let operation = PadOperation::LeavePad;
        let failure = self.enter(operation, id).await;
        self.settle(failure, |state| {
            find_pad(state, id, operation)?;
            state.pads.retain(|p| p.id != id);
            Ok(())
        })
    }

    async fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> Result<(), ApiError> {
        let operation = PadOperation::UpdateSharingPolicy;
        let failure = self.enter(operation, id).await;
        self.settle(failure, |state| {
            let pad = find_pad(state, id, operation)?;
            pad.sharing_policy = policy;
            pad.updated_at = "2024-06-03T00:00:00Z".to_string();
            Ok(())
        })
    }

    async fn fetch_pad_content(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        let operation = PadOperation::FetchPadContent;
        let failure = self.enter(operation, id).await;
        self.settle(failure, |state| {
            find_pad(state, id, operation)?;
            Ok(serde_json::json!({
                "elements": [{"id": format!("{id}-rect"), "type": "rectangle"}],
                "appState": {},
                "files": {},
            }))
        })
    }
}

pub type FakeEngine = SyncEngine<Arc<FakePadApi>>;

pub fn engine(api: &Arc<FakePadApi>, same_tab_policy: SameTabPolicy) -> FakeEngine {
    let options = EngineOptions {
        same_tab_policy,
        ..EngineOptions::default()
    };
    SyncEngine::new(Arc::clone(api), Arc::new(TabCache::new()), options)
}

/// Engine over `api` with the collection already loaded.
pub async fn loaded_engine(api: &Arc<FakePadApi>) -> FakeEngine {
    let engine = engine(api, SameTabPolicy::Queue);
    assert!(engine.load().await.expect("initial load"));
    engine
}

/// Session over `api`, started.
pub async fn started_session(api: &Arc<FakePadApi>) -> PadSession<Arc<FakePadApi>> {
    let session = PadSession::new(
        Arc::clone(api),
        EngineOptions::default(),
        "https://pad.example.com",
    );
    session.start().await.expect("session start");
    session
}

pub fn ids(state: &TabState) -> Vec<String> {
    state.collection.ids().cloned().collect()
}

/// Invariants that must hold whenever nothing is in flight: unique ids, the
/// selection is a member (or unset for an empty collection), and no
/// temporary ids linger.
pub fn assert_settled_invariants(state: &TabState) {
    let mut seen = HashSet::new();
    for id in state.collection.ids() {
        assert!(seen.insert(id.clone()), "duplicate id {id} in {state:?}");
        assert!(!id.starts_with("temp-"), "temp id {id} survived settle");
    }
    assert!(
        state.selection_is_consistent(),
        "selection {:?} inconsistent with {:?}",
        state.selected,
        ids(state)
    );
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}
