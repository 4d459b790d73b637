//! CondoVoice console host.
//!
//! Wires settings, classifier/TTS backends, and the reply sink into an
//! `AssistantEngine`, forwards engine events to stdout, and runs a line
//! command REPL on the main task.

mod console;
mod registry;
mod settings;

use std::io::{BufRead, Write};
use std::sync::Arc;

use condovoice_core::classifier::stub::StubClassifier;
use condovoice_core::playback::{ReplySink, SilentSynthesizer, WavSink};
use condovoice_core::speech::UnsupportedRecognizer;
use condovoice_core::{
    AppState, AssistantEngine, ClassifierHandle, EngineConfig, GeminiClassifier, GeminiTts,
    RecognizerHandle, SessionConfig, SynthesizerHandle, TranscriptKind,
};
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::ConsoleOutcome;
use registry::CondoRegistry;
use settings::{default_settings_path, load_settings, save_settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("condovoice=info")),
        )
        .init();

    let settings_path = default_settings_path();
    let settings = load_settings(&settings_path);
    if !settings_path.exists() {
        if let Err(e) = save_settings(&settings_path, &settings) {
            warn!("could not write default settings: {e}");
        }
    }
    info!(path = %settings_path.display(), "settings loaded");

    let api_key = settings.effective_api_key();

    // Blocking construction (reqwest blocking clients, audio device open
    // handshake) must not run directly on the async runtime.
    let (classifier, synthesizer, sink) =
        tokio::task::block_in_place(|| build_backends(&settings, api_key.as_deref()));

    let state = if settings.seed_demo_data {
        AppState::seeded()
    } else {
        AppState::new()
    };
    let registry = Arc::new(Mutex::new(if settings.seed_demo_data {
        CondoRegistry::seeded()
    } else {
        CondoRegistry::new()
    }));

    let engine = Arc::new(AssistantEngine::new(
        EngineConfig {
            session: SessionConfig {
                min_transcript_chars: settings.min_transcript_chars,
            },
            speak_replies: settings.speak_replies,
        },
        classifier,
        synthesizer,
        sink,
        // No speech backend ships with the console host; voice sessions
        // report as unsupported and `say` drives the dispatch path.
        RecognizerHandle::new(UnsupportedRecognizer),
        state,
    ));

    spawn_event_forwarders(&engine);

    println!("condovoice console — `help` for commands");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        match console::run_command(&line?, &engine, &registry) {
            ConsoleOutcome::Continue(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            ConsoleOutcome::Quit => break,
        }
    }

    info!("console exiting");
    Ok(())
}

fn build_backends(
    settings: &settings::AppSettings,
    api_key: Option<&str>,
) -> (ClassifierHandle, SynthesizerHandle, Box<dyn ReplySink>) {
    let classifier = match api_key {
        Some(key) => {
            info!(model = %settings.classifier_model, "using remote classifier");
            ClassifierHandle::new(
                GeminiClassifier::new(key.to_string()).with_model(&settings.classifier_model),
            )
        }
        None => {
            info!("no API key configured, using offline keyword classifier");
            ClassifierHandle::new(StubClassifier::new())
        }
    };

    let synthesizer = match (settings.speak_replies, api_key) {
        (true, Some(key)) => SynthesizerHandle::new(
            GeminiTts::new(key.to_string())
                .with_model(&settings.tts_model)
                .with_voice(&settings.tts_voice),
        ),
        _ => SynthesizerHandle::new(SilentSynthesizer),
    };

    let sink: Box<dyn ReplySink> = match &settings.reply_wav_dir {
        Some(dir) => {
            info!(dir, "replies will be written as WAV files");
            Box::new(WavSink::new(dir.into()))
        }
        None => match condovoice_core::AudioOutput::open_default() {
            Ok(output) => Box::new(output),
            Err(e) => {
                warn!("audio output unavailable ({e}), replies will not be played");
                Box::new(condovoice_core::playback::NullSink)
            }
        },
    };

    (classifier, synthesizer, sink)
}

/// Print engine events as they arrive so dispatch outcomes are visible
/// between prompts.
fn spawn_event_forwarders(engine: &Arc<AssistantEngine>) {
    let mut transcripts = engine.subscribe_transcripts();
    tokio::spawn(async move {
        while let Ok(event) = transcripts.recv().await {
            match event.kind {
                TranscriptKind::Interim => println!("… {}", event.text),
                TranscriptKind::Final => println!("“{}”", event.text),
            }
        }
    });

    let mut status = engine.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status.recv().await {
            match event.detail {
                Some(detail) => println!("[{:?}] {detail}", event.status),
                None => println!("[{:?}]", event.status),
            }
        }
    });

    let mut replies = engine.subscribe_replies();
    tokio::spawn(async move {
        while let Ok(event) = replies.recv().await {
            let applied = if event.applied { "applied" } else { "no change" };
            println!("→ {:?} ({applied}): {}", event.action, event.reply);
        }
    });
}
