//! Listening-session finite state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start()──► Listening ──finish()──► Finalizing ──complete()──► Idle
//!                       │    └──finish() with a too-short transcript──► Idle
//!                       └──fail()──► Error ──acknowledge()──► Idle
//! ```
//!
//! The FSM is pure — no channels, no I/O — so every transition and guard is
//! unit-testable. `AssistantEngine` drives it from recognizer events and
//! holds it behind a mutex.
//!
//! Interim recognition events carry the *full* cumulative transcript, so each
//! one replaces the current value (last event wins).

use serde::{Deserialize, Serialize};

use crate::error::{CondoVoiceError, Result};

/// Current state of a listening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session open.
    Idle,
    /// Microphone open, transcript accumulating.
    Listening,
    /// Transcript frozen, dispatch in flight.
    Finalizing,
    /// Device/permission failure — transcript invalidated, no dispatch.
    Error,
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// A finalized transcript must exceed this many trimmed characters to be
    /// dispatched; shorter sessions are dropped silently. Default: 2.
    pub min_transcript_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_transcript_chars: 2,
        }
    }
}

/// Result of ending a listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Transcript frozen and handed off — session is now `Finalizing`.
    Dispatch { session_id: u64, transcript: String },
    /// Trimmed transcript was at or under the threshold — session returned
    /// to `Idle` with no dispatch.
    TooShort,
}

/// The state machine itself. One instance lives inside the engine.
#[derive(Debug)]
pub struct ListeningSession {
    config: SessionConfig,
    status: SessionStatus,
    transcript: String,
    /// Monotonically increasing id; also keys the stale-reply guard.
    session_id: u64,
}

impl ListeningSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            status: SessionStatus::Idle,
            transcript: String::new(),
            session_id: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Id of the most recently started session.
    pub fn current_session_id(&self) -> u64 {
        self.session_id
    }

    /// Transcript captured so far (empty outside `Listening`/`Finalizing`).
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Open a new session. Only legal from `Idle`.
    ///
    /// # Errors
    /// `CondoVoiceError::AlreadyListening` when a session is already open.
    pub fn start(&mut self) -> Result<u64> {
        if self.status != SessionStatus::Idle {
            return Err(CondoVoiceError::AlreadyListening);
        }
        self.session_id += 1;
        self.transcript.clear();
        self.status = SessionStatus::Listening;
        Ok(self.session_id)
    }

    /// Replace the transcript with a newer cumulative recognition result.
    ///
    /// # Errors
    /// `CondoVoiceError::NotListening` outside the `Listening` state.
    pub fn replace_transcript(&mut self, text: &str) -> Result<()> {
        if self.status != SessionStatus::Listening {
            return Err(CondoVoiceError::NotListening);
        }
        self.transcript.clear();
        self.transcript.push_str(text);
        Ok(())
    }

    /// End the session: freeze the transcript and decide whether to dispatch.
    ///
    /// # Errors
    /// `CondoVoiceError::NotListening` outside the `Listening` state.
    pub fn finish(&mut self) -> Result<FinishOutcome> {
        if self.status != SessionStatus::Listening {
            return Err(CondoVoiceError::NotListening);
        }
        let trimmed = self.transcript.trim();
        if trimmed.chars().count() <= self.config.min_transcript_chars {
            self.transcript.clear();
            self.status = SessionStatus::Idle;
            return Ok(FinishOutcome::TooShort);
        }
        let transcript = trimmed.to_string();
        self.status = SessionStatus::Finalizing;
        Ok(FinishOutcome::Dispatch {
            session_id: self.session_id,
            transcript,
        })
    }

    /// Dispatch completed (success or failure) — unconditionally back to
    /// `Idle`. The frozen transcript is dropped here.
    pub fn complete(&mut self) {
        self.transcript.clear();
        self.status = SessionStatus::Idle;
    }

    /// Device/permission failure: invalidate the transcript, enter `Error`.
    pub fn fail(&mut self) {
        self.transcript.clear();
        self.status = SessionStatus::Error;
    }

    /// The failure has been surfaced — return to `Idle`.
    pub fn acknowledge_error(&mut self) {
        if self.status == SessionStatus::Error {
            self.status = SessionStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ListeningSession {
        ListeningSession::new(SessionConfig::default())
    }

    #[test]
    fn full_lifecycle_returns_to_idle() {
        let mut s = session();
        let id = s.start().expect("start from idle");
        assert_eq!(id, 1);
        assert_eq!(s.status(), SessionStatus::Listening);

        s.replace_transcript("registra un guasto").expect("listening");
        match s.finish().expect("finish from listening") {
            FinishOutcome::Dispatch {
                session_id,
                transcript,
            } => {
                assert_eq!(session_id, 1);
                assert_eq!(transcript, "registra un guasto");
            }
            FinishOutcome::TooShort => panic!("expected dispatch"),
        }
        assert_eq!(s.status(), SessionStatus::Finalizing);

        s.complete();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.transcript(), "");
    }

    #[test]
    fn start_is_rejected_while_listening_or_finalizing() {
        let mut s = session();
        s.start().unwrap();
        assert!(matches!(s.start(), Err(CondoVoiceError::AlreadyListening)));

        s.replace_transcript("un comando valido").unwrap();
        s.finish().unwrap();
        assert!(matches!(s.start(), Err(CondoVoiceError::AlreadyListening)));
    }

    #[test]
    fn interim_events_replace_not_append() {
        let mut s = session();
        s.start().unwrap();
        s.replace_transcript("registra").unwrap();
        s.replace_transcript("registra un guasto").unwrap();
        assert_eq!(s.transcript(), "registra un guasto");
    }

    #[test]
    fn short_transcript_goes_straight_back_to_idle() {
        let mut s = session();
        s.start().unwrap();
        s.replace_transcript("  ok ").unwrap();
        assert_eq!(s.finish().unwrap(), FinishOutcome::TooShort);
        assert_eq!(s.status(), SessionStatus::Idle);
    }

    #[test]
    fn threshold_is_configurable() {
        let mut s = ListeningSession::new(SessionConfig {
            min_transcript_chars: 10,
        });
        s.start().unwrap();
        s.replace_transcript("sette car").unwrap(); // 9 chars
        assert_eq!(s.finish().unwrap(), FinishOutcome::TooShort);

        s.start().unwrap();
        s.replace_transcript("undici char").unwrap(); // 11 chars
        assert!(matches!(s.finish().unwrap(), FinishOutcome::Dispatch { .. }));
    }

    #[test]
    fn exactly_threshold_length_is_dropped() {
        let mut s = session();
        s.start().unwrap();
        s.replace_transcript("sì").unwrap(); // 2 chars after trim
        assert_eq!(s.finish().unwrap(), FinishOutcome::TooShort);
    }

    #[test]
    fn failure_invalidates_transcript_and_needs_acknowledge() {
        let mut s = session();
        s.start().unwrap();
        s.replace_transcript("qualcosa di lungo").unwrap();
        s.fail();
        assert_eq!(s.status(), SessionStatus::Error);
        assert_eq!(s.transcript(), "");
        assert!(matches!(s.start(), Err(CondoVoiceError::AlreadyListening)));

        s.acknowledge_error();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.start().is_ok());
    }

    #[test]
    fn session_ids_increase_monotonically() {
        let mut s = session();
        assert_eq!(s.start().unwrap(), 1);
        s.replace_transcript("comando uno").unwrap();
        s.finish().unwrap();
        s.complete();
        assert_eq!(s.start().unwrap(), 2);
    }

    #[test]
    fn replace_and_finish_rejected_outside_listening() {
        let mut s = session();
        assert!(matches!(
            s.replace_transcript("x"),
            Err(CondoVoiceError::NotListening)
        ));
        assert!(matches!(s.finish(), Err(CondoVoiceError::NotListening)));
    }
}
