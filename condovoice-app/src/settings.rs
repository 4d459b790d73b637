//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Gemini API key. Absent → the offline keyword classifier is used.
    pub gemini_api_key: Option<String>,
    /// Classifier model name.
    pub classifier_model: String,
    /// TTS model name.
    pub tts_model: String,
    /// TTS voice name.
    pub tts_voice: String,
    /// Finalized transcripts must exceed this many trimmed characters.
    pub min_transcript_chars: usize,
    /// Whether replies are synthesized and played.
    pub speak_replies: bool,
    /// Write spoken replies as WAV files here instead of using the speaker.
    pub reply_wav_dir: Option<String>,
    /// Seed demo tickets and condominiums on startup.
    pub seed_demo_data: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            classifier_model: "gemini-3-flash-preview".into(),
            tts_model: "gemini-2.5-flash-preview-tts".into(),
            tts_voice: "Kore".into(),
            min_transcript_chars: 2,
            speak_replies: true,
            reply_wav_dir: None,
            seed_demo_data: true,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.gemini_api_key = self
            .gemini_api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.classifier_model = non_empty_or(&self.classifier_model, "gemini-3-flash-preview");
        self.tts_model = non_empty_or(&self.tts_model, "gemini-2.5-flash-preview-tts");
        self.tts_voice = non_empty_or(&self.tts_voice, "Kore");
        self.min_transcript_chars = self.min_transcript_chars.clamp(0, 200);
        self.reply_wav_dir = self
            .reply_wav_dir
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    /// API key, with the `GEMINI_API_KEY` environment variable taking
    /// precedence over the settings file.
    pub fn effective_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }
}

fn non_empty_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.into()
    } else {
        trimmed.into()
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("CondoVoice")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("condovoice")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
