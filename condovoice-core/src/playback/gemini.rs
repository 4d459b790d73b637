//! Text-to-speech backed by the Gemini `generateContent` API.
//!
//! The TTS models answer with base64-encoded PCM16LE mono at 24 kHz inside
//! an `inlineData` part, which matches [`super::TTS_SAMPLE_RATE`] directly.
//! A response with no audio part synthesizes to an empty buffer (nothing to
//! play), not an error.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{CondoVoiceError, Result};
use crate::playback::SpeechSynthesizer;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Kore";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: Option<String>,
}

/// Gemini-backed speech synthesizer.
pub struct GeminiTts {
    api_key: String,
    model: String,
    voice: String,
    client: reqwest::blocking::Client,
}

impl GeminiTts {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: &str) -> Self {
        self.voice = voice.to_string();
        self
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        })
    }
}

impl SpeechSynthesizer for GeminiTts {
    fn synthesize(&mut self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(text))
            .send()
            .map_err(|e| CondoVoiceError::Synthesis(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| CondoVoiceError::Synthesis(format!("bad status: {e}")))?;

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| CondoVoiceError::Synthesis(format!("invalid envelope: {e}")))?;

        let Some(encoded) = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.inline_data)
            .and_then(|d| d.data)
        else {
            warn!("synthesis response carried no audio part");
            return Ok(Vec::new());
        };

        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| CondoVoiceError::Synthesis(format!("invalid base64 audio: {e}")))?;
        debug!(bytes = bytes.len(), "synthesized reply audio");
        Ok(bytes)
    }
}
