//! Pad tab records and the local collection that mirrors the server's.
//!
//! - `collection`: ordered, id-unique sequence of tabs
//! - `cache`: the session's single source of truth for what the UI shows
//! - `selection`: pure selection rules applied whenever membership changes

pub mod cache;
pub mod collection;
pub mod selection;

pub use cache::{TabCache, TabState};
pub use collection::TabCollection;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a pad tab.
///
/// Either an opaque server-assigned id or a locally generated temporary id
/// (see [`TEMP_ID_PREFIX`]).
pub type TabId = String;

/// Prefix of locally generated ids. Server ids are UUIDs and never start
/// with it.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Disambiguates temp ids generated within the same millisecond
static TEMP_ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Who may open a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingPolicy {
    #[default]
    Private,
    Whitelist,
    Public,
}

impl SharingPolicy {
    /// Wire spelling
    pub fn as_str(self) -> &'static str {
        match self {
            SharingPolicy::Private => "private",
            SharingPolicy::Whitelist => "whitelist",
            SharingPolicy::Public => "public",
        }
    }
}

impl fmt::Display for SharingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SharingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(SharingPolicy::Private),
            "whitelist" => Ok(SharingPolicy::Whitelist),
            "public" => Ok(SharingPolicy::Public),
            other => Err(format!(
                "unknown sharing policy '{other}' (expected private, whitelist or public)"
            )),
        }
    }
}

/// One collaborative document slot visible to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    /// Creator of the pad; never changes after creation
    pub owner_id: String,
    pub sharing_policy: SharingPolicy,
    pub created_at: String,
    /// Refreshed by every mutation that touches the tab
    pub updated_at: String,
}

impl Tab {
    /// Speculative record shown while a create is in flight.
    ///
    /// The owner is unknown until the server answers.
    pub fn placeholder(id: TabId, title: &str) -> Self {
        let now = now_timestamp();
        Self {
            id,
            title: title.to_string(),
            owner_id: String::new(),
            sharing_policy: SharingPolicy::Private,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether this tab has not been acknowledged by the server yet
    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }

    /// Whether `user_id` created this pad
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.owner_id == user_id
    }
}

/// Whether `id` was generated locally rather than assigned by the server
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Generate a fresh temporary id of the form `temp-<millis>-<seq>`.
pub fn next_temp_id() -> TabId {
    let millis = Utc::now().timestamp_millis();
    let seq = TEMP_ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{TEMP_ID_PREFIX}{millis}-{seq}")
}

/// Current time in the RFC 3339 form used for local `updated_at` values
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
pub(crate) fn test_tab(id: &str, title: &str) -> Tab {
    Tab {
        id: id.to_string(),
        title: title.to_string(),
        owner_id: "owner-1".to_string(),
        sharing_policy: SharingPolicy::Private,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}
