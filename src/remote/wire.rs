//! Server wire shapes and their translation into client types.
//!
//! The server speaks snake_case (`display_name`, `owner_id`, ...); the
//! translation into [`Tab`] is total and keeps every field.

use crate::error::{ApiError, PadOperation};
use crate::remote::PadListing;
use crate::tab::{SharingPolicy, Tab};
use serde::{Deserialize, Serialize};

/// A pad as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRecord {
    pub id: String,
    pub display_name: String,
    pub owner_id: String,
    pub sharing_policy: SharingPolicy,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PadRecord> for Tab {
    fn from(record: PadRecord) -> Self {
        Tab {
            id: record.id,
            title: record.display_name,
            owner_id: record.owner_id,
            sharing_policy: record.sharing_policy,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// The subset of `GET /api/users/me` the sync engine needs.
///
/// Profile fields (username, email, roles, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub pads: Vec<PadRecord>,
    #[serde(default)]
    pub last_selected_pad: Option<String>,
}

impl From<UserResponse> for PadListing {
    fn from(user: UserResponse) -> Self {
        PadListing {
            tabs: user.pads.into_iter().map(Tab::from).collect(),
            last_selected: user.last_selected_pad.filter(|id| !id.is_empty()),
        }
    }
}

/// Body of `PUT /api/pad/{id}/rename`
#[derive(Debug, Serialize)]
pub struct RenameRequest<'a> {
    pub display_name: &'a str,
}

/// Body of `PUT /api/pad/{id}/sharing`
#[derive(Debug, Serialize)]
pub struct SharingRequest {
    pub policy: SharingPolicy,
}

/// Error body. `detail` may be a string or a structured validation list,
/// so it is kept as raw JSON.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

fn non_empty_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Best-effort human message from an error response body.
///
/// Uses the string `detail` field, else the string `message` field, else
/// the operation's fallback message (also for empty or non-JSON bodies).
pub fn error_message(body: &str, operation: PadOperation) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    non_empty_string(parsed.detail)
        .or_else(|| non_empty_string(parsed.message))
        .unwrap_or_else(|| operation.fallback_message().to_string())
}

/// Decode a success body, classifying failures as malformed responses.
pub fn decode<'de, T: Deserialize<'de>>(
    body: &'de str,
    operation: PadOperation,
) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::MalformedResponse {
        operation,
        message: e.to_string(),
    })
}
