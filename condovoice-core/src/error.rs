use thiserror::Error;

/// All errors produced by condovoice-core.
#[derive(Debug, Error)]
pub enum CondoVoiceError {
    #[error("speech recognition is not available on this host")]
    RecognitionUnsupported,

    #[error("recognition error: {0}")]
    Recognition(String),

    #[error("a listening session is already open")]
    AlreadyListening,

    #[error("no listening session is open")]
    NotListening,

    #[error("a dispatch is still in flight — cannot open a new session")]
    DispatchInFlight,

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    #[error("audio output error: {0}")]
    AudioOutput(String),

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CondoVoiceError>;
