use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};

/// Top-level configuration for the Parley service.
///
/// Loaded from `parley.toml` by default. Each section corresponds to one
/// capability or cross-cutting concern. API keys are never stored here;
/// each remote-service section names the environment variable to read
/// them from instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
            completion: CompletionConfig::default(),
            speech: SpeechConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ParleyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address to bind the HTTP server to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

/// Persistence settings: SQLite for turn rows, a directory for audio files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Directory for stored audio artifacts.
    pub audio_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/parley.db".to_string(),
            audio_dir: "data/audio".to_string(),
        }
    }
}

/// Settings for the remote completion model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of the Gemini API.
    pub base_url: String,
    /// Model name to request completions from.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds. One attempt per turn, no retries.
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Settings for the remote speech services (transcription and synthesis).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the ElevenLabs API.
    pub base_url: String,
    /// Voice to synthesize responses with. `ELEVENLABS_VOICE_ID` overrides.
    pub voice_id: String,
    /// Synthesis model identifier.
    pub model_id: String,
    /// Voice stability (0.0 to 1.0).
    pub stability: f32,
    /// Voice similarity boost (0.0 to 1.0).
    pub similarity_boost: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds, applied to both directions.
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Conversation-context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of prior turns serialized into each completion prompt.
    pub context_window: usize,
    /// Number of history rows fetched before the window is applied.
    pub history_fetch_limit: usize,
    /// Replaces the built-in persona preamble when set.
    pub persona: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_window: 3,
            history_fetch_limit: 5,
            persona: None,
        }
    }
}
