//! `StubClassifier` — keyword matcher used when no remote backend is
//! configured.
//!
//! Good enough to exercise the whole session → dispatch → reply pipeline
//! offline: a handful of Italian keywords map onto the closed action set,
//! everything else comes back with no `actionType` (normalized to `Unknown`
//! downstream).

use serde_json::json;
use tracing::debug;

use crate::classifier::{IntentClassifier, RawIntentResponse};
use crate::error::Result;
use crate::state::ContextSnapshot;

pub struct StubClassifier;

impl StubClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier for StubClassifier {
    fn classify(
        &mut self,
        transcript: &str,
        context: &ContextSnapshot,
    ) -> Result<RawIntentResponse> {
        let lower = transcript.to_lowercase();
        debug!(
            transcript_len = transcript.len(),
            open_maintenance = context.open_maintenance_count,
            "StubClassifier::classify"
        );

        let response = if ["guasto", "segnala", "perdita", "ripara", "manutenzione"]
            .iter()
            .any(|k| lower.contains(k))
        {
            RawIntentResponse {
                intent: Some("COMMAND".into()),
                action_type: Some("CREATE_MAINTENANCE".into()),
                params: Some(json!({
                    "subject": transcript.trim(),
                    "urgency": if lower.contains("urgen") || lower.contains("alta") {
                        "Alta"
                    } else {
                        "Media"
                    },
                })),
                speech_response: Some("Ho registrato la segnalazione.".into()),
            }
        } else if ["pagare", "pagament", "rate", "morosi"]
            .iter()
            .any(|k| lower.contains(k))
        {
            RawIntentResponse {
                intent: Some("COMMAND".into()),
                action_type: Some("CHECK_PAGAMENTI".into()),
                params: None,
                speech_response: Some("Ecco la situazione pagamenti.".into()),
            }
        } else if lower.contains("verbale") || lower.contains("assemblea") {
            RawIntentResponse {
                intent: Some("COMMAND".into()),
                action_type: Some("GENERATE_MINUTES".into()),
                params: None,
                speech_response: Some("Apro la sezione assemblee.".into()),
            }
        } else if lower.contains("messaggio") || lower.contains("avvisa") {
            RawIntentResponse {
                intent: Some("COMMAND".into()),
                action_type: Some("SEND_MESSAGE".into()),
                params: None,
                speech_response: Some("Preparo la comunicazione.".into()),
            }
        } else if lower.contains('?') || lower.starts_with("chi") || lower.starts_with("quanto") {
            RawIntentResponse {
                intent: Some("QUERY".into()),
                action_type: Some("INFO_REQUEST".into()),
                params: None,
                speech_response: Some("Al momento posso solo aprire le sezioni richieste.".into()),
            }
        } else {
            RawIntentResponse {
                intent: Some("UNKNOWN".into()),
                action_type: None,
                params: None,
                speech_response: None,
            }
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn context() -> ContextSnapshot {
        AppState::new().snapshot()
    }

    #[test]
    fn maintenance_keywords_produce_create_maintenance() {
        let raw = StubClassifier::new()
            .classify("registra un guasto all'ascensore", &context())
            .expect("stub never fails");
        assert_eq!(raw.action_type.as_deref(), Some("CREATE_MAINTENANCE"));
        assert!(raw.speech_response.is_some());
    }

    #[test]
    fn payment_keywords_produce_check_pagamenti() {
        let raw = StubClassifier::new()
            .classify("chi deve ancora pagare le rate", &context())
            .expect("stub never fails");
        assert_eq!(raw.action_type.as_deref(), Some("CHECK_PAGAMENTI"));
    }

    #[test]
    fn unmatched_text_has_no_action_type() {
        let raw = StubClassifier::new()
            .classify("buongiorno a tutti", &context())
            .expect("stub never fails");
        assert_eq!(raw.action_type, None);
    }
}
