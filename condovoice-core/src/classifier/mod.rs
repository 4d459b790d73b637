//! Intent classifier abstraction.
//!
//! The `IntentClassifier` trait decouples the dispatcher from any specific
//! backend (offline keyword stub, remote Gemini, future local models).
//!
//! `&mut self` on `classify` intentionally expresses that backends may be
//! stateful — connection pools, rolling conversation context, etc. All
//! mutation is therefore serialised through `ClassifierHandle`'s
//! `parking_lot::Mutex`.

pub mod stub;

#[cfg(feature = "gemini")]
pub mod gemini;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::ContextSnapshot;

/// The untrusted wire form of a classifier response.
///
/// Only `speechResponse` is ever relied upon, and even that is defaulted when
/// absent. Everything else is validated by `Interpretation::from_raw` before
/// any state is touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIntentResponse {
    /// Coarse intent class (`COMMAND`, `QUERY`, `DICTATION`, …). Logged only.
    pub intent: Option<String>,
    /// Tag the dispatcher validates against the closed action set.
    pub action_type: Option<String>,
    /// Free-form parameter object for the action.
    pub params: Option<serde_json::Value>,
    /// Reply text to speak back to the user.
    pub speech_response: Option<String>,
}

/// Parse a classifier response body into its raw wire form.
///
/// Tolerates the markdown code fences LLM backends like to wrap JSON in.
/// Returns `None` for anything that is not a JSON object — the caller
/// normalizes that to `Unknown`, it is never an error.
pub fn parse_response_body(body: &str) -> Option<RawIntentResponse> {
    let trimmed = body.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed);
    serde_json::from_str::<RawIntentResponse>(stripped.trim()).ok()
}

/// Contract for intent classification backends.
pub trait IntentClassifier: Send + 'static {
    /// Classify a finalized transcript against the given context snapshot.
    ///
    /// Implementations may block (network I/O) — the engine always calls
    /// this from a blocking task.
    ///
    /// # Errors
    /// Returns an error when the backend is unreachable or times out. The
    /// dispatcher converts every error into the `Unknown` action with an
    /// apology reply; errors never cross the dispatch boundary.
    fn classify(
        &mut self,
        transcript: &str,
        context: &ContextSnapshot,
    ) -> Result<RawIntentResponse>;
}

/// Thread-safe reference-counted handle to any `IntentClassifier` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning behaviour on panic.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<Mutex<dyn IntentClassifier>>);

impl ClassifierHandle {
    /// Wrap any `IntentClassifier` in a `ClassifierHandle`.
    pub fn new<C: IntentClassifier>(classifier: C) -> Self {
        Self(Arc::new(Mutex::new(classifier)))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}
