//! Dispatch: classify a finalized transcript and apply the resulting action.
//!
//! Two properties are enforced here and nowhere else:
//!
//! - The classifier is consulted exactly once per finalized transcript; its
//!   failure never escapes (`interpret` is infallible).
//! - An action is applied at most once, as one batch of reducer commands
//!   under one state lock (`apply`).

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::action::{Action, Interpretation};
use crate::classifier::ClassifierHandle;
use crate::domain::{MaintenanceTicket, Screen, TicketStatus};
use crate::state::{AppState, ContextSnapshot, StateCommand};

/// Lock-free counters tracking dispatch activity. Shared via `Arc`, read by
/// `snapshot()` without stopping the pipeline.
#[derive(Debug, Default)]
pub struct DispatchDiagnostics {
    /// Classifier invocations (one per finalized transcript).
    pub classifier_calls: AtomicUsize,
    /// Classifier invocations that returned an error.
    pub classifier_errors: AtomicUsize,
    /// Responses normalized to `Unknown` (missing or unrecognized tag).
    pub unknown_normalized: AtomicUsize,
    /// Actions that mutated application state.
    pub actions_applied: AtomicUsize,
    /// Replies dropped by the stale-session guard before playback.
    pub replies_suppressed: AtomicUsize,
}

/// Point-in-time copy of [`DispatchDiagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub classifier_calls: usize,
    pub classifier_errors: usize,
    pub unknown_normalized: usize,
    pub actions_applied: usize,
    pub replies_suppressed: usize,
}

impl DispatchDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            classifier_calls: self.classifier_calls.load(Ordering::Relaxed),
            classifier_errors: self.classifier_errors.load(Ordering::Relaxed),
            unknown_normalized: self.unknown_normalized.load(Ordering::Relaxed),
            actions_applied: self.actions_applied.load(Ordering::Relaxed),
            replies_suppressed: self.replies_suppressed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.classifier_calls.store(0, Ordering::Relaxed);
        self.classifier_errors.store(0, Ordering::Relaxed);
        self.unknown_normalized.store(0, Ordering::Relaxed);
        self.actions_applied.store(0, Ordering::Relaxed);
        self.replies_suppressed.store(0, Ordering::Relaxed);
    }
}

/// Run the classifier once and validate its response.
///
/// Infallible: backend errors become `Interpretation::failure()` (the
/// `Unknown` action with the apology reply). Blocking — call from a
/// blocking task.
pub fn interpret(
    classifier: &ClassifierHandle,
    transcript: &str,
    context: &ContextSnapshot,
    diagnostics: &DispatchDiagnostics,
) -> Interpretation {
    diagnostics.classifier_calls.fetch_add(1, Ordering::Relaxed);

    let raw = match classifier.0.lock().classify(transcript, context) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("classifier failed: {e}");
            diagnostics.classifier_errors.fetch_add(1, Ordering::Relaxed);
            return Interpretation::failure();
        }
    };

    debug!(
        intent = raw.intent.as_deref().unwrap_or("-"),
        action_type = raw.action_type.as_deref().unwrap_or("-"),
        "classifier response"
    );

    let interpretation = Interpretation::from_raw(raw);
    if interpretation.action == Action::Unknown {
        diagnostics
            .unknown_normalized
            .fetch_add(1, Ordering::Relaxed);
    }
    interpretation
}

/// Apply an action to application state. Returns `true` when state changed.
///
/// Caller holds the state lock across the whole call, so each dispatch is
/// one atomic batch of reducer commands.
pub fn apply(action: &Action, state: &mut AppState) -> bool {
    match action {
        Action::CreateMaintenanceRequest(params) => {
            let ticket = MaintenanceTicket {
                id: state.mint_ticket_id(),
                subject: params.subject.clone(),
                location: params.location.clone(),
                urgency: params.urgency,
                status: TicketStatus::Open,
                date: chrono::Local::now().date_naive(),
                description: params.description.clone(),
            };
            info!(id = %ticket.id, subject = %ticket.subject, "maintenance ticket created");
            state.reduce(StateCommand::InsertTicket(ticket));
            state.reduce(StateCommand::SetActiveScreen(Screen::Maintenance));
            true
        }
        Action::CheckPayments => {
            state.reduce(StateCommand::SetActiveScreen(Screen::Accounting));
            true
        }
        Action::GenerateMinutes => {
            state.reduce(StateCommand::SetActiveScreen(Screen::Assemblies));
            true
        }
        // Reply-only actions: acknowledged in speech, no state change.
        Action::SendMessage | Action::InfoRequest | Action::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{MaintenanceParams, APOLOGY_REPLY};
    use crate::classifier::{IntentClassifier, RawIntentResponse};
    use crate::domain::Urgency;
    use crate::error::{CondoVoiceError, Result};

    struct FailingClassifier;

    impl IntentClassifier for FailingClassifier {
        fn classify(
            &mut self,
            _transcript: &str,
            _context: &ContextSnapshot,
        ) -> Result<RawIntentResponse> {
            Err(CondoVoiceError::Classifier("connection refused".into()))
        }
    }

    struct FixedClassifier(RawIntentResponse);

    impl IntentClassifier for FixedClassifier {
        fn classify(
            &mut self,
            _transcript: &str,
            _context: &ContextSnapshot,
        ) -> Result<RawIntentResponse> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn classifier_failure_becomes_unknown_with_apology() {
        let diagnostics = DispatchDiagnostics::default();
        let handle = ClassifierHandle::new(FailingClassifier);
        let context = AppState::new().snapshot();

        let out = interpret(&handle, "apri i pagamenti", &context, &diagnostics);
        assert_eq!(out.action, Action::Unknown);
        assert_eq!(out.reply, APOLOGY_REPLY);

        let snap = diagnostics.snapshot();
        assert_eq!(snap.classifier_calls, 1);
        assert_eq!(snap.classifier_errors, 1);
    }

    #[test]
    fn unrecognized_tag_counts_as_unknown_not_error() {
        let diagnostics = DispatchDiagnostics::default();
        let handle = ClassifierHandle::new(FixedClassifier(RawIntentResponse {
            intent: Some("COMMAND".into()),
            action_type: Some("DELETE_EVERYTHING".into()),
            params: None,
            speech_response: Some("Elimino tutto.".into()),
        }));
        let context = AppState::new().snapshot();

        let out = interpret(&handle, "elimina tutto", &context, &diagnostics);
        assert_eq!(out.action, Action::Unknown);

        let snap = diagnostics.snapshot();
        assert_eq!(snap.classifier_errors, 0);
        assert_eq!(snap.unknown_normalized, 1);
    }

    #[test]
    fn create_maintenance_inserts_open_ticket_and_switches_screen() {
        let mut state = AppState::seeded();
        let action = Action::CreateMaintenanceRequest(MaintenanceParams {
            subject: "Guasto ascensore".into(),
            location: "Scala A".into(),
            urgency: Urgency::High,
            description: "Fermo al terzo piano.".into(),
        });

        assert!(apply(&action, &mut state));
        assert_eq!(state.tickets.len(), 3);
        // Newest first
        let ticket = &state.tickets[0];
        assert_eq!(ticket.subject, "Guasto ascensore");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.urgency, Urgency::High);
        assert_eq!(ticket.id, "mr-3");
        assert_eq!(state.active_screen, Screen::Maintenance);
    }

    #[test]
    fn reapplying_an_identical_action_creates_a_second_distinct_ticket() {
        let mut state = AppState::new();
        let action = Action::CreateMaintenanceRequest(MaintenanceParams::default());

        assert!(apply(&action, &mut state));
        assert!(apply(&action, &mut state));

        assert_eq!(state.tickets.len(), 2);
        assert_ne!(state.tickets[0].id, state.tickets[1].id);
        // Everything but the minted id matches
        assert_eq!(state.tickets[0].subject, state.tickets[1].subject);
        assert_eq!(state.tickets[0].urgency, state.tickets[1].urgency);
    }

    #[test]
    fn screen_only_actions_navigate_without_tickets() {
        let mut state = AppState::new();
        assert!(apply(&Action::CheckPayments, &mut state));
        assert_eq!(state.active_screen, Screen::Accounting);
        assert!(state.tickets.is_empty());

        assert!(apply(&Action::GenerateMinutes, &mut state));
        assert_eq!(state.active_screen, Screen::Assemblies);
    }

    #[test]
    fn reply_only_actions_do_not_touch_state() {
        let mut state = AppState::seeded();
        let before_screen = state.active_screen;
        let before_len = state.tickets.len();

        for action in [Action::SendMessage, Action::InfoRequest, Action::Unknown] {
            assert!(!apply(&action, &mut state));
        }
        assert_eq!(state.active_screen, before_screen);
        assert_eq!(state.tickets.len(), before_len);
    }

    #[test]
    fn diagnostics_reset_zeroes_all_counters() {
        let diagnostics = DispatchDiagnostics::default();
        let handle = ClassifierHandle::new(FailingClassifier);
        let context = AppState::new().snapshot();
        interpret(&handle, "x", &context, &diagnostics);

        diagnostics.reset();
        let snap = diagnostics.snapshot();
        assert_eq!(snap.classifier_calls, 0);
        assert_eq!(snap.classifier_errors, 0);
    }
}
