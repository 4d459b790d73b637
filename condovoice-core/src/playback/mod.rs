//! Reply synthesis and playback.
//!
//! Replies are fire-and-forget: the engine synthesizes on a blocking task
//! and hands the decoded samples to a [`ReplySink`]. Playback failures are
//! logged, never surfaced to the dispatch path.
//!
//! The synthesis contract is raw PCM16LE mono at [`TTS_SAMPLE_RATE`];
//! [`decode_pcm16`] converts that to the `f32` samples sinks consume.

pub mod resample;

#[cfg(feature = "audio-cpal")]
pub mod output;

#[cfg(feature = "gemini")]
pub mod gemini;

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::Result;

/// Sample rate of synthesized reply audio, in Hz.
pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Contract for text-to-speech backends.
pub trait SpeechSynthesizer: Send + 'static {
    /// Synthesize `text` into PCM16LE mono at [`TTS_SAMPLE_RATE`].
    ///
    /// An empty buffer means "nothing to play" and is not an error.
    ///
    /// # Errors
    /// Fails when the backend is unreachable or rejects the request.
    fn synthesize(&mut self, text: &str) -> Result<Vec<u8>>;
}

/// Thread-safe reference-counted handle to any `SpeechSynthesizer`.
#[derive(Clone)]
pub struct SynthesizerHandle(pub Arc<Mutex<dyn SpeechSynthesizer>>);

impl SynthesizerHandle {
    pub fn new<S: SpeechSynthesizer>(synthesizer: S) -> Self {
        Self(Arc::new(Mutex::new(synthesizer)))
    }
}

impl std::fmt::Debug for SynthesizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizerHandle").finish_non_exhaustive()
    }
}

/// Synthesizer that produces no audio. Used when speaking is disabled.
#[derive(Debug, Default)]
pub struct SilentSynthesizer;

impl SpeechSynthesizer for SilentSynthesizer {
    fn synthesize(&mut self, _text: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Offline stand-in that renders a short sine beep per reply, long enough to
/// exercise the playback path without a remote backend.
#[derive(Debug)]
pub struct ToneSynthesizer {
    freq_hz: f32,
    duration_ms: u32,
}

impl ToneSynthesizer {
    pub fn new() -> Self {
        Self {
            freq_hz: 660.0,
            duration_ms: 180,
        }
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for ToneSynthesizer {
    fn synthesize(&mut self, _text: &str) -> Result<Vec<u8>> {
        let total = (TTS_SAMPLE_RATE * self.duration_ms / 1000) as usize;
        let mut bytes = Vec::with_capacity(total * 2);
        for n in 0..total {
            let t = n as f32 / TTS_SAMPLE_RATE as f32;
            // Linear fade-out avoids a click at the end of the beep.
            let envelope = 1.0 - n as f32 / total as f32;
            let sample = (TAU * self.freq_hz * t).sin() * envelope * 0.4;
            let value = (sample * i16::MAX as f32) as i16;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        Ok(bytes)
    }
}

/// Decode PCM16LE bytes into normalized `f32` samples in `[-1.0, 1.0]`.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Consumer of decoded reply audio.
pub trait ReplySink: Send + 'static {
    /// Play (or persist) one reply's worth of samples at [`TTS_SAMPLE_RATE`].
    ///
    /// # Errors
    /// Fails on device or I/O problems; the engine logs and drops the reply.
    fn play(&mut self, samples: &[f32]) -> Result<()>;
}

/// Sink that discards all audio.
#[derive(Debug, Default)]
pub struct NullSink;

impl ReplySink for NullSink {
    fn play(&mut self, _samples: &[f32]) -> Result<()> {
        Ok(())
    }
}

/// Sink that writes each reply to a numbered WAV file under a directory.
/// Useful headless and for inspecting synthesis output.
#[derive(Debug)]
pub struct WavSink {
    dir: PathBuf,
    next_index: u32,
}

impl WavSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, next_index: 1 }
    }
}

impl ReplySink for WavSink {
    fn play(&mut self, samples: &[f32]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("reply-{:04}.wav", self.next_index));
        self.next_index += 1;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: TTS_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| crate::error::CondoVoiceError::AudioOutput(e.to_string()))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| crate::error::CondoVoiceError::AudioOutput(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| crate::error::CondoVoiceError::AudioOutput(e.to_string()))?;
        info!(path = %path.display(), samples = samples.len(), "reply written");
        Ok(())
    }
}
