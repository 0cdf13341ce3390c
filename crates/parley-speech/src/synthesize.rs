//! ElevenLabs text-to-speech client.
//!
//! Posts reply text to `/v1/text-to-speech/{voice_id}` and returns the MP3
//! bytes. Synthesis is best-effort from the orchestrator's point of view, so
//! every failure path here maps to [`ParleyError::Synthesis`] and never
//! aborts a turn on its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use parley_core::config::SpeechConfig;
use parley_core::{ParleyError, Result};

use crate::SynthesisService;

/// Environment variable that overrides the configured voice.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

/// Client for the ElevenLabs text-to-speech endpoint.
pub struct ElevenLabsSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
}

/// Request body for the synthesis endpoint.
#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Voice tuning parameters.
#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsSynthesizer {
    /// Create a client from a [`SpeechConfig`], resolving the API key from
    /// the environment. The voice may also be overridden through the
    /// [`VOICE_ID_ENV`] variable without touching the configuration file.
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ParleyError::Config(format!(
                "Speech API key not found: set the {} environment variable",
                config.api_key_env
            ))
        })?;

        let mut synthesizer = Self::new(api_key, config)?;
        if let Ok(voice_id) = std::env::var(VOICE_ID_ENV) {
            if !voice_id.is_empty() {
                synthesizer.voice_id = voice_id;
            }
        }
        Ok(synthesizer)
    }

    /// Create a client with an explicit API key (useful for testing). The
    /// voice is taken from the configuration verbatim.
    pub fn new(api_key: String, config: &SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::Synthesis(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
        })
    }

    fn build_request_body<'a>(&'a self, text: &'a str) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        }
    }
}

#[async_trait]
impl SynthesisService for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);
        let body = self.build_request_body(text);

        tracing::debug!(
            voice = %self.voice_id,
            text_len = text.len(),
            "Sending synthesis request"
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Synthesis(format!("Synthesis request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(ParleyError::Synthesis(format!(
                "Synthesis API returned {status}: {error_body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ParleyError::Synthesis(format!("Failed to read synthesis response: {e}")))?
            .to_vec();

        tracing::debug!(audio_bytes = audio.len(), "Received synthesized audio");

        Ok(audio)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> ElevenLabsSynthesizer {
        let config = SpeechConfig {
            base_url,
            ..Default::default()
        };
        ElevenLabsSynthesizer::new("xi-test-key".to_string(), &config).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let config = SpeechConfig::default();
        let synthesizer =
            ElevenLabsSynthesizer::new("xi-test-key".to_string(), &config).unwrap();
        let body = synthesizer.build_request_body("Hello, world!");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "Hello, world!");
        assert_eq!(json["model_id"], "eleven_monolingual_v1");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.5);
    }

    #[tokio::test]
    async fn test_synthesize_sends_expected_request() {
        let mock_server = MockServer::start().await;
        let audio = vec![0xFF, 0xFB, 0x90, 0x00];

        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
            .and(header("xi-api-key", "xi-test-key"))
            .and(header("Accept", "audio/mpeg"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello!",
                "model_id": "eleven_monolingual_v1"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(audio.clone())
                    .insert_header("content-type", "audio/mpeg"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let synthesizer = test_client(mock_server.uri());
        let bytes = synthesizer.synthesize("Hello!").await.unwrap();
        assert_eq!(bytes, audio);
    }

    #[tokio::test]
    async fn test_synthesize_uses_configured_voice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/custom-voice"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x00]))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = SpeechConfig {
            base_url: mock_server.uri(),
            voice_id: "custom-voice".to_string(),
            ..Default::default()
        };
        let synthesizer =
            ElevenLabsSynthesizer::new("xi-test-key".to_string(), &config).unwrap();
        assert!(synthesizer.synthesize("Hi").await.is_ok());
    }

    #[tokio::test]
    async fn test_synthesize_maps_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"detail":{"status":"invalid_api_key"}}"#),
            )
            .mount(&mock_server)
            .await;

        let synthesizer = test_client(mock_server.uri());
        let result = synthesizer.synthesize("Hello").await;

        match result {
            Err(ParleyError::Synthesis(msg)) => assert!(msg.contains("401")),
            other => panic!("expected synthesis error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_requires_api_key() {
        std::env::remove_var("PARLEY_TTS_TEST_MISSING_KEY");
        let config = SpeechConfig {
            api_key_env: "PARLEY_TTS_TEST_MISSING_KEY".to_string(),
            ..Default::default()
        };
        let result = ElevenLabsSynthesizer::from_config(&config);
        assert!(matches!(result, Err(ParleyError::Config(_))));
    }

    #[test]
    fn test_voice_env_override() {
        std::env::set_var("PARLEY_TTS_TEST_OVERRIDE_KEY", "xi-test-key");
        std::env::set_var(VOICE_ID_ENV, "env-voice");

        let config = SpeechConfig {
            api_key_env: "PARLEY_TTS_TEST_OVERRIDE_KEY".to_string(),
            ..Default::default()
        };
        let synthesizer = ElevenLabsSynthesizer::from_config(&config).unwrap();
        assert_eq!(synthesizer.voice_id, "env-voice");

        std::env::remove_var(VOICE_ID_ENV);
        std::env::remove_var("PARLEY_TTS_TEST_OVERRIDE_KEY");
    }
}
