//! Boundary to the pad server.
//!
//! [`PadApi`] has one call per mutation kind plus the collection fetch. Each
//! call either returns the typed payload or fails with an [`ApiError`]; no
//! call retries. [`http::HttpPadApi`] is the production implementation.

pub mod http;
pub mod wire;

use crate::error::ApiError;
use crate::tab::{SharingPolicy, Tab, TabCollection, TabId};
use std::future::Future;
use std::sync::Arc;

/// The user's pads as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PadListing {
    /// Pads in server order
    pub tabs: Vec<Tab>,
    /// The pad the user last had open, if the server remembers one
    pub last_selected: Option<TabId>,
}

impl PadListing {
    /// Convert to a collection whose active tab is the last-selected pad
    /// when it is listed, else the first pad, else unset.
    pub fn into_collection(self) -> TabCollection {
        let active = match self.last_selected {
            Some(id) if self.tabs.iter().any(|t| t.id == id) => Some(id),
            _ => self.tabs.first().map(|t| t.id.clone()),
        };
        TabCollection::new(self.tabs, active)
    }
}

/// Remote calls consumed by the sync engine.
///
/// Implementations must be cheap to share; the engine holds one for the
/// whole session and calls it from spawned tasks.
pub trait PadApi: Send + Sync + 'static {
    /// Fetch every pad visible to the user plus the last-selected pad id.
    fn fetch_pads(&self) -> impl Future<Output = Result<PadListing, ApiError>> + Send;

    /// Create a pad owned by the user and return the server's record.
    fn create_pad(&self) -> impl Future<Output = Result<Tab, ApiError>> + Send;

    fn rename_pad(
        &self,
        id: &str,
        new_name: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete a pad the user owns.
    fn delete_pad(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove a pad shared with the user from their list.
    fn leave_pad(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch a pad's document as raw JSON.
    fn fetch_pad_content(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;
}

impl<T: PadApi> PadApi for Arc<T> {
    fn fetch_pads(&self) -> impl Future<Output = Result<PadListing, ApiError>> + Send {
        (**self).fetch_pads()
    }

    fn create_pad(&self) -> impl Future<Output = Result<Tab, ApiError>> + Send {
        (**self).create_pad()
    }

    fn rename_pad(
        &self,
        id: &str,
        new_name: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).rename_pad(id, new_name)
    }

    fn delete_pad(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).delete_pad(id)
    }

    fn leave_pad(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).leave_pad(id)
    }

    fn update_sharing_policy(
        &self,
        id: &str,
        policy: SharingPolicy,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).update_sharing_policy(id, policy)
    }

    fn fetch_pad_content(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        (**self).fetch_pad_content(id)
    }
}
