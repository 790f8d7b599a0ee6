//! Optimistic mutation engine.
//!
//! Every mutation runs the same lifecycle on its own tokio task:
//!
//! 1. take the tab's lock (queue or reject, per [`SameTabPolicy`])
//! 2. snapshot the cache and apply the speculative change
//! 3. await the remote call
//! 4. commit the server's answer, or roll the change back
//! 5. schedule a reconciliation fetch, whatever the outcome
//!
//! Reconciliation fetches are superseded by any newer fetch or mutation:
//! each carries the generation it started at and its result is dropped if
//! the generation moved on or a mutation is still in flight. The last
//! mutation to settle always schedules a fresh fetch, so the cache still
//! converges on server truth.

pub mod events;
pub mod mutation;
pub mod pending;
pub mod tab_locks;

pub use events::{EventBus, SyncEvent};
pub use mutation::MutationKind;

use crate::error::{ApiError, StateConflict, SyncError};
use crate::remote::PadApi;
use crate::tab::{SharingPolicy, Tab, TabCache, TabId, TabState, next_temp_id, selection};
use mutation::{CreatePad, DeletePad, LeavePad, Mutation, RenamePad, UpdateSharingPolicy};
use padsync_config::{SameTabPolicy, SyncConfig, defaults};
use parking_lot::Mutex;
use pending::PendingCounts;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tab_locks::{TabGuard, TabLocks};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Engine behaviour knobs, usually taken from [`SyncConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// What a second mutation of an in-flight tab does
    pub same_tab_policy: SameTabPolicy,
    /// Title shown on the placeholder while a create is in flight
    pub new_pad_title: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            same_tab_policy: defaults::same_tab_policy(),
            new_pad_title: defaults::new_pad_title(),
        }
    }
}

impl From<&SyncConfig> for EngineOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            same_tab_policy: config.same_tab_policy,
            new_pad_title: config.new_pad_title.clone(),
        }
    }
}

/// How a mutation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    /// The server accepted it and the cache holds the final state
    Committed(T),
    /// The target tab was not present locally; nothing was sent
    AlreadySettled,
}

impl<T> MutationOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }
}

struct Shared<A> {
    api: A,
    cache: Arc<TabCache>,
    options: EngineOptions,
    locks: Arc<TabLocks>,
    /// Replaced at session end so mutations from an ended session no longer
    /// hold back fetches of the next one
    pending: Mutex<Arc<PendingCounts>>,
    /// Bumped by every fetch start, mutation start and mutation settle
    generation: AtomicU64,
    /// Bumped when the session ends; a mutation from an older epoch settles
    /// without touching the cache
    epoch: AtomicU64,
    events: EventBus,
    reconciles: Mutex<Vec<JoinHandle<()>>>,
}

/// Drives optimistic mutations of the pad collection held in a
/// [`TabCache`]. Cloning is cheap and clones share all state.
pub struct SyncEngine<A> {
    shared: Arc<Shared<A>>,
}

impl<A> Clone for SyncEngine<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: PadApi> SyncEngine<A> {
    pub fn new(api: A, cache: Arc<TabCache>, options: EngineOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                cache,
                options,
                locks: Arc::new(TabLocks::default()),
                pending: Mutex::new(Arc::new(PendingCounts::default())),
                generation: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                events: EventBus::default(),
                reconciles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<TabCache> {
        &self.shared.cache
    }

    pub fn api(&self) -> &A {
        &self.shared.api
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Whether a mutation of `kind` is in flight
    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.shared.pending().is_pending(kind)
    }

    /// Number of mutations in flight across all kinds
    pub fn in_flight(&self) -> usize {
        self.shared.pending().total()
    }

    /// Whether a mutation currently holds `id`
    pub fn is_busy(&self, id: &str) -> bool {
        self.shared.locks.is_locked(id)
    }

    /// Fetch the collection now and apply it unless superseded.
    ///
    /// Returns whether the result was applied. Failures are returned, not
    /// just logged, since the caller asked for this fetch.
    pub async fn load(&self) -> Result<bool, ApiError> {
        self.shared.fetch_and_apply().await
    }

    /// Schedule a background reconciliation fetch.
    pub fn invalidate(&self) {
        self.shared.schedule_reconcile();
    }

    /// Clear the cache for a session end. Fetches in flight are discarded,
    /// and mutations in flight still report to their callers but no longer
    /// write to the cache or schedule a fetch.
    pub fn end_session(&self) {
        self.shared.cache.patch(|state| {
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *self.shared.pending.lock() = Arc::new(PendingCounts::default());
            *state = TabState::default();
        });
    }

    /// Wait for every scheduled reconciliation fetch to finish.
    pub async fn wait_idle(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.shared.reconciles.lock());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    log::warn!("Reconciliation task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Create a pad. A placeholder is appended and selected immediately;
    /// on success it is replaced by the server's record.
    pub async fn create_pad(&self) -> Result<Tab, SyncError> {
        let mutation = CreatePad {
            temp_id: next_temp_id(),
            title: self.shared.options.new_pad_title.clone(),
        };
        match self.execute(mutation).await? {
            MutationOutcome::Committed(tab) => Ok(tab),
            MutationOutcome::AlreadySettled => Err(SyncError::Aborted {
                message: "create was not applied".to_string(),
            }),
        }
    }

    pub async fn rename_pad(
        &self,
        id: &str,
        new_name: &str,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.execute(RenamePad {
            id: id.to_string(),
            new_name: new_name.to_string(),
        })
        .await
    }

    /// Delete a pad the user owns.
    pub async fn delete_pad(&self, id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.execute(DeletePad { id: id.to_string() }).await
    }

    /// Leave a pad shared with the user.
    pub async fn leave_pad(&self, id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.execute(LeavePad { id: id.to_string() }).await
    }

    pub async fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.execute(UpdateSharingPolicy {
            id: id.to_string(),
            policy,
        })
        .await
    }

    /// Serialize on the target tab, then run the mutation on its own task so
    /// that dropping the caller's future cannot strand a speculative change.
    async fn execute<M: Mutation>(
        &self,
        mutation: M,
    ) -> Result<MutationOutcome<M::Output>, SyncError> {
        let guard = match self.shared.options.same_tab_policy {
            SameTabPolicy::Queue => self.shared.locks.acquire(mutation.target()).await,
            SameTabPolicy::Reject => match self.shared.locks.try_acquire(mutation.target()) {
                Some(guard) => guard,
                None => {
                    log::debug!(
                        "Rejecting {} of {}: another change is in flight",
                        mutation.kind(),
                        mutation.target()
                    );
                    return Err(SyncError::Busy {
                        id: mutation.target().to_string(),
                    });
                }
            },
        };

        let kind = mutation.kind();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.run(mutation, guard))
            .await
            .map_err(|e| {
                log::error!("{} task did not settle: {}", kind, e);
                SyncError::Aborted {
                    message: e.to_string(),
                }
            })?
    }
}

impl<A: PadApi> Shared<A> {
    fn pending(&self) -> Arc<PendingCounts> {
        Arc::clone(&self.pending.lock())
    }

    async fn run<M: Mutation>(
        self: Arc<Self>,
        mutation: M,
        _guard: TabGuard,
    ) -> Result<MutationOutcome<M::Output>, SyncError> {
        let kind = mutation.kind();
        let target: TabId = mutation.target().to_string();

        let started = self.cache.patch(|state| {
            let snapshot = state.clone();
            mutation.speculate(state)?;
            self.generation.fetch_add(1, Ordering::SeqCst);
            let epoch = self.epoch.load(Ordering::SeqCst);
            let pending = self.pending.lock().start(kind);
            Ok::<_, StateConflict>((snapshot, epoch, pending))
        });
        let (snapshot, epoch, pending) = match started {
            Ok(started) => started,
            Err(conflict) => {
                log::debug!("Skipping {}: {}", kind, conflict);
                return Ok(MutationOutcome::AlreadySettled);
            }
        };
        log::debug!("Speculated {} of {}", kind, target);

        let result = mutation.send(&self.api).await;

        let (settled, live) = self.cache.patch(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            let live = self.epoch.load(Ordering::SeqCst) == epoch;
            // The session ended while in flight: settle against a detached
            // copy so the caller still gets its outcome
            let mut detached = None;
            let into = if live {
                state
            } else {
                detached.insert(snapshot.clone())
            };
            let settled = match result {
                Ok(payload) => Ok(mutation.commit(into, &snapshot, payload)),
                Err(err) => {
                    mutation.rollback(into, &snapshot);
                    Err(err)
                }
            };
            drop(pending);
            (settled, live)
        });
        if live {
            self.schedule_reconcile();
        } else {
            log::debug!(
                "Session ended during {} of {}; cache left untouched",
                kind,
                target
            );
        }

        match settled {
            Ok((output, event)) => {
                log::info!("Committed {} of {}", kind, target);
                self.events.emit(event);
                Ok(MutationOutcome::Committed(output))
            }
            Err(err) => {
                log::info!("Rolled back {} of {}: {}", kind, target, err);
                self.events.emit(SyncEvent::RolledBack {
                    kind,
                    id: target,
                    message: err.user_message().to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn schedule_reconcile(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            if let Err(e) = shared.fetch_and_apply().await {
                log::warn!("Reconciliation fetch failed: {}", e);
            }
        });
        let mut tasks = self.reconciles.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    async fn fetch_and_apply(&self) -> Result<bool, ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let collection = self.api.fetch_pads().await?.into_collection();

        let applied = self.cache.patch(|state| {
            if self.generation.load(Ordering::SeqCst) != generation || self.pending().total() > 0 {
                return None;
            }
            state.collection = collection;
            selection::reselect_if_stale(state);
            Some(state.collection.len())
        });

        match applied {
            Some(tabs) => {
                log::debug!("Reconciled {} pads (generation {})", tabs, generation);
                self.events.emit(SyncEvent::Reconciled { tabs });
                Ok(true)
            }
            None => {
                log::debug!("Discarding superseded fetch (generation {})", generation);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_sync_config() {
        let config = SyncConfig {
            same_tab_policy: SameTabPolicy::Reject,
            new_pad_title: "Untitled".to_string(),
        };
        let options = EngineOptions::from(&config);
        assert_eq!(options.same_tab_policy, SameTabPolicy::Reject);
        assert_eq!(options.new_pad_title, "Untitled");
    }

    #[test]
    fn default_options_queue() {
        let options = EngineOptions::default();
        assert_eq!(options.same_tab_policy, SameTabPolicy::Queue);
        assert_eq!(options.new_pad_title, "New pad");
    }

    #[test]
    fn outcome_reports_commit() {
        assert!(MutationOutcome::Committed(()).is_committed());
        assert!(!MutationOutcome::<()>::AlreadySettled.is_committed());
    }
}
