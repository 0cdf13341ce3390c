//! ElevenLabs speech-to-text client.
//!
//! Posts recorded audio as multipart form data to `/v1/speech-to-text` and
//! returns the transcript. A transcript that is empty after trimming is
//! reported as [`ParleyError::EmptyTranscript`] so callers can distinguish
//! unusable input from a service fault.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use parley_core::config::SpeechConfig;
use parley_core::{ParleyError, Result};

use crate::TranscriptionService;

/// Client for the ElevenLabs speech-to-text endpoint.
pub struct ElevenLabsTranscriber {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ElevenLabsTranscriber {
    /// Create a client from a [`SpeechConfig`], resolving the API key from
    /// the environment. Fails if the variable is unset.
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ParleyError::Config(format!(
                "Speech API key not found: set the {} environment variable",
                config.api_key_env
            ))
        })?;
        Self::new(api_key, config)
    }

    /// Create a client with an explicit API key (useful for testing).
    pub fn new(api_key: String, config: &SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ParleyError::Transcription(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl TranscriptionService for ElevenLabsTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let url = format!("{}/v1/speech-to-text", self.base_url);
        let part = Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ParleyError::Transcription(format!("Invalid audio part: {e}")))?;
        let form = Form::new().part("audio", part);

        tracing::debug!(audio_bytes = audio.len(), "Sending transcription request");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParleyError::Transcription(format!("Transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(ParleyError::Transcription(format!(
                "Transcription API returned {status}: {error_body}"
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            ParleyError::Transcription(format!("Invalid transcription response: {e}"))
        })?;

        // A missing `text` field is treated as an empty transcript.
        let transcript = payload
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();

        if transcript.is_empty() {
            return Err(ParleyError::EmptyTranscript);
        }

        tracing::debug!(transcript_len = transcript.len(), "Received transcript");

        Ok(transcript)
    }
}

// =============================================================================
// Tests
// =============================================================================
