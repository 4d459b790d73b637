//! # condovoice-core
//!
//! Voice-command engine SDK for the condominium management assistant.
//!
//! ## Architecture
//!
//! ```text
//! SpeechRecognizer → RecognitionEvent channel → session loop (spawn_blocking)
//!                                                     │
//!                                          ListeningSession FSM
//!                                                     │
//!                                    IntentClassifier::classify (once)
//!                                                     │
//!                                 validate → Action → AppState::reduce
//!                                                     │
//!                          broadcast::Sender<ReplyEvent> + TTS playback
//! ```
//!
//! Dispatch is at-most-once: each finalized transcript produces exactly one
//! classifier call and at most one batch of state mutations. Reply playback
//! is fire-and-forget and never blocks the next session.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod action;
pub mod classifier;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod playback;
pub mod session;
pub mod speech;
pub mod state;

// Convenience re-exports for downstream crates
pub use action::{Action, ActionKind, Interpretation, MaintenanceParams};
pub use classifier::{ClassifierHandle, IntentClassifier, RawIntentResponse};
pub use engine::{AssistantEngine, EngineConfig};
pub use error::CondoVoiceError;
pub use ipc::events::{ReplyEvent, SessionStatusEvent, TranscriptEvent, TranscriptKind};
pub use playback::{ReplySink, SpeechSynthesizer, SynthesizerHandle};
pub use session::{SessionConfig, SessionStatus};
pub use speech::{RecognitionEvent, RecognizerHandle, SpeechRecognizer};
pub use state::{AppState, ContextSnapshot};

#[cfg(feature = "gemini")]
pub use classifier::gemini::GeminiClassifier;

#[cfg(feature = "gemini")]
pub use playback::gemini::GeminiTts;

#[cfg(feature = "audio-cpal")]
pub use playback::output::AudioOutput;
