//! Remote intent classifier backed by the Gemini `generateContent` API.
//!
//! The request pins a JSON response schema so the model answers with the
//! `{intent, actionType, params, speechResponse}` wire shape; the body is
//! still treated as untrusted and goes through `parse_response_body`.
//!
//! Calls are blocking — the engine invokes `classify` from a blocking task.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::classifier::{parse_response_body, IntentClassifier, RawIntentResponse};
use crate::error::{CondoVoiceError, Result};
use crate::state::ContextSnapshot;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
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
    text: Option<String>,
}

/// Gemini-backed classifier.
pub struct GeminiClassifier {
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiClassifier {
    /// Create a classifier from the `GEMINI_API_KEY` environment variable.
    /// Returns `None` when the key is absent or blank.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("GEMINI_API_KEY").ok()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    /// Create a classifier with an explicit API key.
    pub fn new(api_key: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Override the model name.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn request_body(transcript: &str, context: &ContextSnapshot) -> serde_json::Value {
        let context_json =
            serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
        let prompt = format!(
            "Analizza questo comando condominiale: \"{transcript}\". \
             Contesto: {context_json}. Rispondi in italiano."
        );
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "intent": {
                            "type": "STRING",
                            "enum": ["COMMAND", "QUERY", "DICTATION"]
                        },
                        "actionType": {
                            "type": "STRING",
                            "enum": [
                                "CREATE_MAINTENANCE",
                                "CHECK_PAGAMENTI",
                                "SEND_MESSAGE",
                                "GENERATE_MINUTES",
                                "INFO_REQUEST"
                            ]
                        },
                        "params": { "type": "OBJECT" },
                        "speechResponse": { "type": "STRING" }
                    },
                    "required": ["intent", "speechResponse"]
                }
            }
        })
    }
}

impl IntentClassifier for GeminiClassifier {
    fn classify(
        &mut self,
        transcript: &str,
        context: &ContextSnapshot,
    ) -> Result<RawIntentResponse> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(transcript, context))
            .send()
            .map_err(|e| CondoVoiceError::Classifier(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| CondoVoiceError::Classifier(format!("bad status: {e}")))?;

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| CondoVoiceError::Classifier(format!("invalid envelope: {e}")))?;

        let Some(text) = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
        else {
            warn!("classifier returned no text part — treating as empty response");
            return Ok(RawIntentResponse::default());
        };

        debug!(body_len = text.len(), "classifier response received");

        // A syntactically broken body is not an error: it normalizes to
        // Unknown downstream, exactly like a missing actionType.
        Ok(parse_response_body(&text).unwrap_or_else(|| {
            warn!("classifier response body was not a JSON object");
            RawIntentResponse::default()
        }))
    }
}
