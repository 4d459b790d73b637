//! Wire-level event payloads.
//!
//! All events serialize with camelCase field names so JSON-speaking hosts
//! consume them without renaming. `seq` is a global monotonic counter shared
//! across event kinds; hosts use it to detect drops and re-order.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::session::SessionStatus;

/// Whether a transcript event is still mutable or frozen for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// Cumulative text so far; will be replaced by the next event.
    Interim,
    /// The frozen transcript handed to the dispatcher.
    Final,
}

/// A transcript update for one listening session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    pub seq: u64,
    pub session_id: u64,
    pub text: String,
    pub kind: TranscriptKind,
}

/// Session state change, with an optional human-readable detail (set for
/// `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SessionStatusEvent {
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Error,
            detail: Some(detail.into()),
        }
    }
}

/// Dispatch outcome for one finalized transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEvent {
    pub seq: u64,
    pub session_id: u64,
    /// Which action the command resolved to (`UNKNOWN` when nothing matched).
    pub action: ActionKind,
    /// The reply text, always non-empty.
    pub reply: String,
    /// Whether the action mutated application state.
    pub applied: bool,
    /// Whether playback of the reply was scheduled. Always `false` when
    /// speaking is disabled; playback itself is fire-and-forget.
    pub spoken: bool,
}
