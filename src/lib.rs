// Library exports for the padsync binary and integration tests.
//
// # Mutex Usage Policy
//
// padsync uses two mutex types:
//
//   - `parking_lot::Mutex`:   sync-only state held for the duration of a
//                               single non-async step (the tab cache, pending
//                               counts, the tab lock registry). Never hold one
//                               across an `.await`.
//
//   - `tokio::sync::Mutex`:   per-tab mutation locks, which are held from
//                               speculation until the remote call settles and
//                               therefore across `.await` points.

/// Application version (root crate version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod debug;

pub mod actions;
pub mod cli;
pub mod error;
pub mod remote;
pub mod session;
pub mod sync;
pub mod tab;

pub use error::{ApiError, PadOperation, StateConflict, SyncError};
pub use remote::{PadApi, PadListing};
pub use session::{ActionOutcome, PadContent, PadSession};
pub use sync::{EngineOptions, MutationKind, MutationOutcome, SyncEngine, SyncEvent};
pub use tab::{SharingPolicy, Tab, TabCache, TabCollection, TabId, TabState};
