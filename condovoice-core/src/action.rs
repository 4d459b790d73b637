//! The closed action set and the parse-then-validate step that produces it.
//!
//! Everything the classifier returns is untrusted: `actionType` strings are
//! matched against the closed set below and anything else — missing tags,
//! unknown tags, malformed params — normalizes to [`Action::Unknown`]. No
//! untyped payload crosses this boundary.

use serde::{Deserialize, Serialize};

use crate::classifier::RawIntentResponse;
use crate::domain::Urgency;

/// Fallback reply when the classifier is unreachable or its response is
/// unusable.
pub const APOLOGY_REPLY: &str = "Scusa, ho avuto un problema nel processare il comando.";

/// Fallback reply when the command was understood as nothing actionable.
pub const CLARIFY_REPLY: &str = "Non ho capito il comando, puoi ripeterlo?";

/// Default subject for a maintenance request the classifier left blank.
pub const DEFAULT_SUBJECT: &str = "Segnalazione Generica";

/// Default location for a maintenance request the classifier left blank.
pub const DEFAULT_LOCATION: &str = "Condominio";

/// Parameters of a voice-created maintenance request, after defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceParams {
    pub subject: String,
    pub location: String,
    pub urgency: Urgency,
    pub description: String,
}

impl Default for MaintenanceParams {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.into(),
            location: DEFAULT_LOCATION.into(),
            urgency: Urgency::default(),
            description: String::new(),
        }
    }
}

impl MaintenanceParams {
    /// Extract params from the classifier's untyped `params` object.
    ///
    /// Missing or blank fields take the documented defaults; an unknown
    /// urgency label falls back to `Media`.
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        let mut params = Self::default();
        let Some(obj) = value.and_then(|v| v.as_object()) else {
            return params;
        };

        if let Some(subject) = non_empty_str(obj.get("subject")) {
            params.subject = subject;
        }
        if let Some(location) = non_empty_str(obj.get("location")) {
            params.location = location;
        }
        if let Some(urgency) = non_empty_str(obj.get("urgency")) {
            params.urgency = Urgency::from_label(&urgency).unwrap_or_default();
        }
        if let Some(description) = non_empty_str(obj.get("description")) {
            params.description = description;
        }
        params
    }
}

fn non_empty_str(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// One of the closed set of application actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateMaintenanceRequest(MaintenanceParams),
    CheckPayments,
    SendMessage,
    GenerateMinutes,
    InfoRequest,
    Unknown,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateMaintenanceRequest(_) => ActionKind::CreateMaintenance,
            Self::CheckPayments => ActionKind::CheckPayments,
            Self::SendMessage => ActionKind::SendMessage,
            Self::GenerateMinutes => ActionKind::GenerateMinutes,
            Self::InfoRequest => ActionKind::InfoRequest,
            Self::Unknown => ActionKind::Unknown,
        }
    }
}

/// Payload-free discriminant of [`Action`], used in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    CreateMaintenance,
    CheckPayments,
    SendMessage,
    GenerateMinutes,
    InfoRequest,
    Unknown,
}

/// A validated classifier outcome: the typed action plus the reply to speak.
///
/// The reply is always non-empty, whatever the classifier returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub action: Action,
    pub reply: String,
}

impl Interpretation {
    /// Validate a raw classifier response into the closed action set.
    pub fn from_raw(raw: RawIntentResponse) -> Self {
        let action = match raw.action_type.as_deref().map(str::trim) {
            Some("CREATE_MAINTENANCE") => {
                Action::CreateMaintenanceRequest(MaintenanceParams::from_value(raw.params.as_ref()))
            }
            Some("CHECK_PAGAMENTI") => Action::CheckPayments,
            Some("SEND_MESSAGE") => Action::SendMessage,
            Some("GENERATE_MINUTES") => Action::GenerateMinutes,
            Some("INFO_REQUEST") => Action::InfoRequest,
            _ => Action::Unknown,
        };

        let reply = raw
            .speech_response
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| {
                if action == Action::Unknown {
                    CLARIFY_REPLY.into()
                } else {
                    APOLOGY_REPLY.into()
                }
            });

        Self { action, reply }
    }

    /// Outcome used when the classifier could not be reached at all.
    pub fn failure() -> Self {
        Self {
            action: Action::Unknown,
            reply: APOLOGY_REPLY.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(action_type: Option<&str>, params: Option<serde_json::Value>) -> RawIntentResponse {
        RawIntentResponse {
            intent: Some("COMMAND".into()),
            action_type: action_type.map(ToOwned::to_owned),
            params,
            speech_response: Some("Fatto.".into()),
        }
    }

    #[test]
    fn known_tags_map_to_their_variants() {
        let cases = [
            ("CHECK_PAGAMENTI", Action::CheckPayments),
            ("SEND_MESSAGE", Action::SendMessage),
            ("GENERATE_MINUTES", Action::GenerateMinutes),
            ("INFO_REQUEST", Action::InfoRequest),
        ];
        for (tag, expected) in cases {
            let out = Interpretation::from_raw(raw(Some(tag), None));
            assert_eq!(out.action, expected, "tag {tag}");
            assert_eq!(out.reply, "Fatto.");
        }
    }

    #[test]
    fn tags_outside_the_closed_set_normalize_to_unknown() {
        for tag in ["DELETE_EVERYTHING", "create_maintenance", "", "  ", "DROP"] {
            let out = Interpretation::from_raw(raw(Some(tag), None));
            assert_eq!(out.action, Action::Unknown, "tag {tag:?}");
        }
        let out = Interpretation::from_raw(raw(None, None));
        assert_eq!(out.action, Action::Unknown);
    }

    #[test]
    fn maintenance_params_take_documented_defaults() {
        let out = Interpretation::from_raw(raw(Some("CREATE_MAINTENANCE"), Some(json!({}))));
        let Action::CreateMaintenanceRequest(params) = out.action else {
            panic!("expected maintenance action");
        };
        assert_eq!(params.subject, DEFAULT_SUBJECT);
        assert_eq!(params.location, DEFAULT_LOCATION);
        assert_eq!(params.urgency, Urgency::Medium);
        assert_eq!(params.description, "");
    }

    #[test]
    fn maintenance_params_defaulting_is_deterministic() {
        let value = json!({"subject": "Guasto ascensore", "urgency": "Alta"});
        let a = MaintenanceParams::from_value(Some(&value));
        let b = MaintenanceParams::from_value(Some(&value));
        assert_eq!(a, b);
        assert_eq!(a.subject, "Guasto ascensore");
        assert_eq!(a.urgency, Urgency::High);
        assert_eq!(a.location, DEFAULT_LOCATION);
    }

    #[test]
    fn unknown_urgency_label_falls_back_to_medium() {
        let value = json!({"urgency": "catastrofica"});
        let params = MaintenanceParams::from_value(Some(&value));
        assert_eq!(params.urgency, Urgency::Medium);
    }

    #[test]
    fn non_object_params_are_ignored() {
        let value = json!("not an object");
        let params = MaintenanceParams::from_value(Some(&value));
        assert_eq!(params, MaintenanceParams::default());
    }

    #[test]
    fn missing_reply_falls_back_per_variant() {
        let mut r = raw(Some("CHECK_PAGAMENTI"), None);
        r.speech_response = None;
        assert_eq!(Interpretation::from_raw(r).reply, APOLOGY_REPLY);

        let mut r = raw(Some("NOT_A_TAG"), None);
        r.speech_response = Some("   ".into());
        let out = Interpretation::from_raw(r);
        assert_eq!(out.action, Action::Unknown);
        assert_eq!(out.reply, CLARIFY_REPLY);
    }

    #[test]
    fn failure_outcome_is_unknown_with_apology() {
        let out = Interpretation::failure();
        assert_eq!(out.action, Action::Unknown);
        assert_eq!(out.reply, APOLOGY_REPLY);
    }
}
