//! Per-tab actions offered to the user.
//!
//! Owners manage their pads; everyone else can only copy the link or leave.

use crate::tab::{SharingPolicy, Tab};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabAction {
    Rename,
    CopyUrl,
    ToggleSharing,
    Delete,
    Leave,
}

impl TabAction {
    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            TabAction::Rename => "Rename",
            TabAction::CopyUrl => "Copy URL",
            TabAction::ToggleSharing => "Toggle sharing",
            TabAction::Delete => "Delete",
            TabAction::Leave => "Leave shared pad",
        }
    }

    /// Whether the action removes the tab from the user's list
    pub fn is_destructive(self) -> bool {
        matches!(self, TabAction::Delete | TabAction::Leave)
    }
}

impl fmt::Display for TabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Actions available on `tab` for `current_user_id`.
pub fn available_actions(tab: &Tab, current_user_id: &str) -> Vec<TabAction> {
    if tab.is_owned_by(current_user_id) {
        vec![
            TabAction::Rename,
            TabAction::CopyUrl,
            TabAction::ToggleSharing,
            TabAction::Delete,
        ]
    } else {
        vec![TabAction::CopyUrl, TabAction::Leave]
    }
}

/// Policy the sharing toggle switches to. Only flips between public and
/// private; a whitelisted pad becomes public.
pub fn toggled_policy(current: SharingPolicy) -> SharingPolicy {
    match current {
        SharingPolicy::Public => SharingPolicy::Private,
        SharingPolicy::Private | SharingPolicy::Whitelist => SharingPolicy::Public,
    }
}

/// Shareable link to a pad
pub fn pad_url(origin: &str, id: &str) -> String {
    format!("{}/pad/{}", origin.trim_end_matches('/'), id)
}
