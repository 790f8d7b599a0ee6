//! Notifications emitted as mutations settle and reconciliation lands.

use super::mutation::MutationKind;
use crate::tab::{SharingPolicy, Tab, TabId};
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A placeholder was replaced by the server's record
    Created { temp_id: TabId, tab: Tab },
    Renamed { id: TabId, title: String },
    Deleted { id: TabId },
    /// The user left a shared pad; `title` is the title it had when left
    Left { id: TabId, title: String },
    SharingChanged { id: TabId, policy: SharingPolicy },
    /// A mutation failed and its speculative change was undone
    RolledBack {
        kind: MutationKind,
        id: TabId,
        message: String,
    },
    /// A full fetch replaced the collection
    Reconciled { tabs: usize },
}

/// Broadcast fan-out of [`SyncEvent`]s. Emitting with no subscribers is a
/// no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        // Err only means nobody is listening
        let _ = self.tx.send(event);
    }
}
