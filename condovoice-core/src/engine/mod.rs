//! `AssistantEngine` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! AssistantEngine::new()
//!     └─► start_session()   → recognizer open, session = Listening
//!         └─► (End event)   → session = Finalizing, classify + apply once
//!             └─► reply     → event emitted, playback fire-and-forget
//! ```
//!
//! `start_session()` in the wrong state returns an error rather than
//! panicking; `submit_text()` runs the identical dispatch path without a
//! recognizer.
//!
//! ## Threading
//!
//! Recognizer events are consumed and dispatched on a `spawn_blocking` task
//! (the classifier call is blocking network I/O). Reply synthesis and
//! playback run on their own blocking task so they never delay the next
//! session; a stale-session check right before playback drops replies that
//! were overtaken by a newer session.

pub mod dispatch;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    classifier::ClassifierHandle,
    error::{CondoVoiceError, Result},
    ipc::events::{ReplyEvent, SessionStatusEvent, TranscriptEvent, TranscriptKind},
    playback::{decode_pcm16, ReplySink, SynthesizerHandle},
    session::{FinishOutcome, ListeningSession, SessionConfig, SessionStatus},
    speech::{RecognitionEvent, RecognizerHandle},
    state::{AppState, ContextSnapshot},
};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `AssistantEngine`.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    /// Whether replies are synthesized and played. Dispatch is unaffected
    /// when `false`; hosts still get the reply text in events.
    pub speak_replies: bool,
}

/// The top-level engine handle.
///
/// `AssistantEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<AssistantEngine>` to share between host commands and
/// event-forwarding async tasks.
pub struct AssistantEngine {
    config: EngineConfig,
    classifier: ClassifierHandle,
    synthesizer: SynthesizerHandle,
    sink: Arc<Mutex<Box<dyn ReplySink>>>,
    recognizer: RecognizerHandle,
    state: Arc<Mutex<AppState>>,
    session: Arc<Mutex<ListeningSession>>,
    /// `true` from transcript freeze until the action is applied. Blocks new
    /// sessions so each command resolves before the next begins.
    dispatch_inflight: Arc<AtomicBool>,
    transcript_tx: broadcast::Sender<TranscriptEvent>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
    reply_tx: broadcast::Sender<ReplyEvent>,
    /// Monotonically increasing event sequence counter.
    seq: Arc<AtomicU64>,
    diagnostics: Arc<dispatch::DispatchDiagnostics>,
}

impl AssistantEngine {
    pub fn new(
        config: EngineConfig,
        classifier: ClassifierHandle,
        synthesizer: SynthesizerHandle,
        sink: Box<dyn ReplySink>,
        recognizer: RecognizerHandle,
        state: AppState,
    ) -> Self {
        let (transcript_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (reply_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            session: Arc::new(Mutex::new(ListeningSession::new(config.session.clone()))),
            config,
            classifier,
            synthesizer,
            sink: Arc::new(Mutex::new(sink)),
            recognizer,
            state: Arc::new(Mutex::new(state)),
            dispatch_inflight: Arc::new(AtomicBool::new(false)),
            transcript_tx,
            status_tx,
            reply_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(dispatch::DispatchDiagnostics::default()),
        }
    }

    /// Open a listening session: start the recognizer and consume its events
    /// until `End` or `Error`. Returns the new session id once the
    /// recognizer has started.
    ///
    /// # Errors
    /// - `CondoVoiceError::DispatchInFlight` while a previous command is
    ///   still being applied.
    /// - `CondoVoiceError::AlreadyListening` when a session is open.
    /// - Recognizer start failures (`RecognitionUnsupported`, device errors)
    ///   pass through; the session returns to `Idle`.
    pub fn start_session(&self) -> Result<u64> {
        if self.dispatch_inflight.load(Ordering::SeqCst) {
            return Err(CondoVoiceError::DispatchInFlight);
        }

        // Context is captured at session start, not at dispatch: the
        // classifier sees the state the user was looking at when speaking.
        let context = self.state.lock().snapshot();

        let (event_tx, event_rx) = crossbeam_channel::unbounded::<RecognitionEvent>();

        let session_id = {
            let mut session = self.session.lock();
            let id = session.start()?;
            if let Err(e) = self.recognizer.0.lock().start(event_tx) {
                session.fail();
                session.acknowledge_error();
                self.emit_status(SessionStatusEvent::error(e.to_string()));
                self.emit_status(SessionStatusEvent::new(SessionStatus::Idle));
                return Err(e);
            }
            id
        };

        self.emit_status(SessionStatusEvent::new(SessionStatus::Listening));
        info!(session_id, "listening session started");

        let shared = self.shared();
        tokio::task::spawn_blocking(move || {
            session_loop(&shared, session_id, event_rx, &context);
        });

        Ok(session_id)
    }

    /// Ask the recognizer to finish early. The session closes when the
    /// recognizer emits its `End` event.
    ///
    /// # Errors
    /// `CondoVoiceError::NotListening` when no session is open.
    pub fn stop_session(&self) -> Result<()> {
        if self.session.lock().status() != SessionStatus::Listening {
            return Err(CondoVoiceError::NotListening);
        }
        self.recognizer.0.lock().stop();
        info!("session stop requested");
        Ok(())
    }

    /// Dispatch typed text through the same validation and apply path a
    /// spoken command takes. Degradation path for hosts without speech.
    ///
    /// # Errors
    /// Same session guards as `start_session`.
    pub fn submit_text(&self, text: &str) -> Result<u64> {
        if self.dispatch_inflight.load(Ordering::SeqCst) {
            return Err(CondoVoiceError::DispatchInFlight);
        }

        let context = self.state.lock().snapshot();

        let (session_id, outcome) = {
            let mut session = self.session.lock();
            let id = session.start()?;
            // start() cleared the transcript; a failure here is impossible
            // while the lock is held.
            session.replace_transcript(text)?;
            (id, session.finish()?)
        };

        match outcome {
            FinishOutcome::TooShort => {
                self.emit_status(SessionStatusEvent::new(SessionStatus::Idle));
                Ok(session_id)
            }
            FinishOutcome::Dispatch { transcript, .. } => {
                let shared = self.shared();
                tokio::task::spawn_blocking(move || {
                    dispatch_transcript(&shared, session_id, transcript, &context);
                });
                Ok(session_id)
            }
        }
    }

    /// Current session status (snapshot).
    pub fn status(&self) -> SessionStatus {
        self.session.lock().status()
    }

    /// Shared application state, for host screens and commands.
    pub fn state(&self) -> Arc<Mutex<AppState>> {
        Arc::clone(&self.state)
    }

    /// Subscribe to live transcript events.
    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.transcript_tx.subscribe()
    }

    /// Subscribe to session status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to dispatch outcome events.
    pub fn subscribe_replies(&self) -> broadcast::Receiver<ReplyEvent> {
        self.reply_tx.subscribe()
    }

    /// Snapshot of dispatch counters for observability.
    pub fn diagnostics_snapshot(&self) -> dispatch::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn emit_status(&self, event: SessionStatusEvent) {
        let _ = self.status_tx.send(event);
    }

    fn shared(&self) -> EngineShared {
        EngineShared {
            config: self.config.clone(),
            classifier: self.classifier.clone(),
            synthesizer: self.synthesizer.clone(),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            session: Arc::clone(&self.session),
            dispatch_inflight: Arc::clone(&self.dispatch_inflight),
            transcript_tx: self.transcript_tx.clone(),
            status_tx: self.status_tx.clone(),
            reply_tx: self.reply_tx.clone(),
            seq: Arc::clone(&self.seq),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

/// Everything a background task needs, cloned out of the engine.
#[derive(Clone)]
struct EngineShared {
    config: EngineConfig,
    classifier: ClassifierHandle,
    synthesizer: SynthesizerHandle,
    sink: Arc<Mutex<Box<dyn ReplySink>>>,
    state: Arc<Mutex<AppState>>,
    session: Arc<Mutex<ListeningSession>>,
    dispatch_inflight: Arc<AtomicBool>,
    transcript_tx: broadcast::Sender<TranscriptEvent>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
    reply_tx: broadcast::Sender<ReplyEvent>,
    seq: Arc<AtomicU64>,
    diagnostics: Arc<dispatch::DispatchDiagnostics>,
}

impl EngineShared {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn emit_status(&self, event: SessionStatusEvent) {
        let _ = self.status_tx.send(event);
    }
}

/// Consume recognizer events for one session until a terminal event.
/// Runs on a blocking task.
fn session_loop(
    shared: &EngineShared,
    session_id: u64,
    events: crossbeam_channel::Receiver<RecognitionEvent>,
    context: &ContextSnapshot,
) {
    let _span = tracing::info_span!("session", id = session_id).entered();
    while let Ok(event) = events.recv() {
        match event {
            RecognitionEvent::Interim(text) => {
                // A stale session (superseded, errored) stops consuming.
                if shared.session.lock().replace_transcript(&text).is_err() {
                    return;
                }
                let _ = shared.transcript_tx.send(TranscriptEvent {
                    seq: shared.next_seq(),
                    session_id,
                    text,
                    kind: TranscriptKind::Interim,
                });
            }
            RecognitionEvent::Error(message) => {
                warn!(session_id, "recognition failed: {message}");
                let mut session = shared.session.lock();
                session.fail();
                shared.emit_status(SessionStatusEvent::error(message));
                session.acknowledge_error();
                shared.emit_status(SessionStatusEvent::new(SessionStatus::Idle));
                return;
            }
            RecognitionEvent::End => {
                let outcome = {
                    let mut session = shared.session.lock();
                    match session.finish() {
                        Ok(outcome) => outcome,
                        // Session already closed (error raced the end event).
                        Err(_) => return,
                    }
                };
                match outcome {
                    FinishOutcome::TooShort => {
                        info!(session_id, "transcript too short, nothing dispatched");
                        shared.emit_status(SessionStatusEvent::new(SessionStatus::Idle));
                    }
                    FinishOutcome::Dispatch { transcript, .. } => {
                        dispatch_transcript(shared, session_id, transcript, context);
                    }
                }
                return;
            }
        }
    }
}

/// Classify, apply, emit the reply event, and hand the reply text to the
/// playback task. Exactly one classifier call and at most one state
/// mutation per invocation.
fn dispatch_transcript(
    shared: &EngineShared,
    session_id: u64,
    transcript: String,
    context: &ContextSnapshot,
) {
    shared.dispatch_inflight.store(true, Ordering::SeqCst);
    shared.emit_status(SessionStatusEvent::new(SessionStatus::Finalizing));

    let _ = shared.transcript_tx.send(TranscriptEvent {
        seq: shared.next_seq(),
        session_id,
        text: transcript.clone(),
        kind: TranscriptKind::Final,
    });

    let interpretation =
        dispatch::interpret(&shared.classifier, &transcript, context, &shared.diagnostics);

    let applied = {
        let mut state = shared.state.lock();
        dispatch::apply(&interpretation.action, &mut state)
    };
    if applied {
        shared
            .diagnostics
            .actions_applied
            .fetch_add(1, Ordering::Relaxed);
    }

    shared.session.lock().complete();
    shared.dispatch_inflight.store(false, Ordering::SeqCst);
    shared.emit_status(SessionStatusEvent::new(SessionStatus::Idle));

    let spoken = shared.config.speak_replies && !interpretation.reply.is_empty();
    let _ = shared.reply_tx.send(ReplyEvent {
        seq: shared.next_seq(),
        session_id,
        action: interpretation.action.kind(),
        reply: interpretation.reply.clone(),
        applied,
        spoken,
    });

    info!(
        session_id,
        action = ?interpretation.action.kind(),
        applied,
        "command dispatched"
    );

    if spoken {
        let shared = shared.clone();
        let reply = interpretation.reply;
        tokio::task::spawn_blocking(move || speak_reply(&shared, session_id, &reply));
    }
}

/// Synthesize and play one reply. Fire-and-forget: failures are logged and
/// a reply overtaken by a newer session is dropped.
fn speak_reply(shared: &EngineShared, session_id: u64, reply: &str) {
    let audio = match shared.synthesizer.0.lock().synthesize(reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(session_id, "reply synthesis failed: {e}");
            return;
        }
    };
    if audio.is_empty() {
        return;
    }

    // Stale guard: a newer session owns the stage now.
    if shared.session.lock().current_session_id() != session_id {
        shared
            .diagnostics
            .replies_suppressed
            .fetch_add(1, Ordering::Relaxed);
        info!(session_id, "reply superseded by a newer session, not played");
        return;
    }

    let samples = decode_pcm16(&audio);
    if let Err(e) = shared.sink.lock().play(&samples) {
        warn!(session_id, "reply playback failed: {e}");
    }
}
