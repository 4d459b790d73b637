//! Speech recognition seam.
//!
//! Recognition is platform-provided and outside this crate's scope; the
//! engine only consumes a stream of [`RecognitionEvent`]s. Hosts plug in
//! whatever backend they have through [`SpeechRecognizer`]. The crate ships
//! two implementations: [`UnsupportedRecognizer`] for hosts without a
//! backend (text entry still works) and [`ScriptedRecognizer`] for tests.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::error::{CondoVoiceError, Result};

/// Event emitted by a recognition backend during a listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A new cumulative transcript. Each event carries the full text so far
    /// and replaces the previous one.
    Interim(String),
    /// The backend finished (silence timeout, user stop). No more events
    /// follow for this session.
    End,
    /// Device or permission failure. Terminal, like `End`.
    Error(String),
}

/// Contract for speech recognition backends.
pub trait SpeechRecognizer: Send + 'static {
    /// Begin recognizing and push events into `events` until `End` or
    /// `Error` is sent. Must not block: backends run their capture loop on
    /// their own thread.
    ///
    /// # Errors
    /// Fails when the backend cannot start at all (no device, no support).
    fn start(&mut self, events: Sender<RecognitionEvent>) -> Result<()>;

    /// Ask the backend to finish early. The backend still emits `End` on its
    /// event channel; stopping twice is harmless.
    fn stop(&mut self);
}

/// Thread-safe reference-counted handle to any `SpeechRecognizer` implementor.
#[derive(Clone)]
pub struct RecognizerHandle(pub Arc<Mutex<dyn SpeechRecognizer>>);

impl RecognizerHandle {
    pub fn new<R: SpeechRecognizer>(recognizer: R) -> Self {
        Self(Arc::new(Mutex::new(recognizer)))
    }
}

impl std::fmt::Debug for RecognizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerHandle").finish_non_exhaustive()
    }
}

/// Recognizer for hosts without a speech backend. `start` always fails, so
/// sessions never open; the manual text path is unaffected.
#[derive(Debug, Default)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn start(&mut self, _events: Sender<RecognitionEvent>) -> Result<()> {
        Err(CondoVoiceError::RecognitionUnsupported)
    }

    fn stop(&mut self) {}
}

/// Test/demo recognizer that replays a fixed script of events from a spawned
/// thread, with a small delay between events.
pub struct ScriptedRecognizer {
    script: Vec<RecognitionEvent>,
    event_gap: Duration,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<RecognitionEvent>) -> Self {
        Self {
            script,
            event_gap: Duration::from_millis(5),
        }
    }

    pub fn with_event_gap(mut self, gap: Duration) -> Self {
        self.event_gap = gap;
        self
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&mut self, events: Sender<RecognitionEvent>) -> Result<()> {
        let script = self.script.clone();
        let gap = self.event_gap;
        std::thread::spawn(move || {
            for event in script {
                std::thread::sleep(gap);
                if events.send(event).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn unsupported_recognizer_refuses_to_start() {
        let (tx, _rx) = unbounded();
        let err = UnsupportedRecognizer.start(tx).unwrap_err();
        assert!(matches!(err, CondoVoiceError::RecognitionUnsupported));
    }

    #[test]
    fn scripted_recognizer_replays_its_script_in_order() {
        let (tx, rx) = unbounded();
        let mut rec = ScriptedRecognizer::new(vec![
            RecognitionEvent::Interim("apri".into()),
            RecognitionEvent::Interim("apri la contabilità".into()),
            RecognitionEvent::End,
        ])
        .with_event_gap(Duration::from_millis(1));
        rec.start(tx).expect("scripted start never fails");

        let timeout = Duration::from_secs(1);
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            RecognitionEvent::Interim("apri".into())
        );
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            RecognitionEvent::Interim("apri la contabilità".into())
        );
        assert_eq!(rx.recv_timeout(timeout).unwrap(), RecognitionEvent::End);
    }
}
