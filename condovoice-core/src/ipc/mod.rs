//! Events the engine broadcasts to hosts (UI processes, consoles, tests).

pub mod events;

pub use events::{ReplyEvent, SessionStatusEvent, TranscriptEvent, TranscriptKind};
