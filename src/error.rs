//! Typed error types for the pad sync client.
//!
//! Callers at the crate boundary match on these instead of opaque `anyhow`
//! strings. The taxonomy:
//!
//! - [`ApiError`]: a remote call failed (transport, rejection, bad payload)
//! - [`SyncError`]: what a mutation caller sees once local state has already
//!   been rolled back
//! - [`StateConflict`]: the target tab is not present locally; the engine
//!   treats it as already settled and never surfaces it

use crate::tab::TabId;
use std::fmt;
use thiserror::Error;

/// The remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadOperation {
    FetchPads,
    CreatePad,
    RenamePad,
    DeletePad,
    LeavePad,
    UpdateSharingPolicy,
    FetchPadContent,
}

impl PadOperation {
    /// Message shown when the server gives no usable `detail` or `message`.
    pub fn fallback_message(self) -> &'static str {
        match self {
            PadOperation::FetchPads => "Failed to fetch user pads.",
            PadOperation::CreatePad => "Failed to create new pad",
            PadOperation::RenamePad => "Failed to rename pad",
            PadOperation::DeletePad => "Failed to delete pad",
            PadOperation::LeavePad => "Failed to leave shared pad.",
            PadOperation::UpdateSharingPolicy => "Failed to update sharing policy",
            PadOperation::FetchPadContent => "Failed to fetch pad data.",
        }
    }
}

impl fmt::Display for PadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PadOperation::FetchPads => "fetch pads",
            PadOperation::CreatePad => "create pad",
            PadOperation::RenamePad => "rename pad",
            PadOperation::DeletePad => "delete pad",
            PadOperation::LeavePad => "leave pad",
            PadOperation::UpdateSharingPolicy => "update sharing policy",
            PadOperation::FetchPadContent => "fetch pad content",
        };
        f.write_str(name)
    }
}

/// A failed boundary call against the pad API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be received.
    #[error("{operation}: network error: {message}")]
    Transport {
        operation: PadOperation,
        message: String,
    },

    /// The server answered with a non-success status.
    ///
    /// `message` is the best-effort human-readable reason: the body's
    /// `detail` field, else its `message` field, else the operation's
    /// fallback text.
    #[error("{message} (HTTP {status})")]
    Rejected {
        operation: PadOperation,
        status: u16,
        message: String,
    },

    /// A success response whose body does not match the expected shape.
    #[error("{operation}: malformed response: {message}")]
    MalformedResponse {
        operation: PadOperation,
        message: String,
    },
}

impl ApiError {
    /// The operation that failed.
    pub fn operation(&self) -> PadOperation {
        match self {
            ApiError::Transport { operation, .. }
            | ApiError::Rejected { operation, .. }
            | ApiError::MalformedResponse { operation, .. } => *operation,
        }
    }

    /// Text suitable for direct display to the user.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Rejected { message, .. } => message,
            ApiError::Transport { operation, .. }
            | ApiError::MalformedResponse { operation, .. } => operation.fallback_message(),
        }
    }

    /// HTTP status for rejections, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error surfaced to a mutation caller.
///
/// By the time one of these is returned, the cache has already been restored
/// to a consistent state; callers only need to display it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The remote call failed and the speculative change was rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Another mutation on the same tab is still in flight and the engine is
    /// configured to reject rather than queue.
    #[error("pad {id} is busy with another change")]
    Busy { id: TabId },

    /// The mutation task stopped before settling (panic or runtime shutdown).
    #[error("mutation aborted: {message}")]
    Aborted { message: String },
}

impl SyncError {
    /// Text suitable for direct display to the user.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Api(api) => api.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

/// The mutation targets a tab that is not in the local collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pad {id} is not present locally")]
pub struct StateConflict {
    pub id: TabId,
}
