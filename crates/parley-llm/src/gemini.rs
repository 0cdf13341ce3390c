//! Gemini completion client.
//!
//! Sends one-shot `generateContent` requests to the Gemini REST API and
//! extracts the first candidate's text. One attempt per turn with a bounded
//! timeout; there is no retry, no streaming, and no tool-calling. The API
//! key is resolved from the environment variable named in the configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use parley_core::config::CompletionConfig;
use parley_core::{ContextPair, ParleyError, Result};

use crate::prompt::{build_prompt, DEFAULT_PERSONA};
use crate::CompletionService;

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    persona: String,
}

impl GeminiClient {
    /// Create a client from a [`CompletionConfig`], resolving the API key
    /// from the environment. Fails if the variable is unset so the missing
    /// key surfaces at startup rather than on the first turn.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ParleyError::Config(format!(
                "Completion API key not found: set the {} environment variable",
                config.api_key_env
            ))
        })?;
        Self::new(api_key, config)
    }

    /// Create a client with an explicit API key (useful for testing).
    pub fn new(api_key: String, config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::Completion(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            persona: DEFAULT_PERSONA.to_string(),
        })
    }

    /// Replace the built-in persona preamble.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, user_message: &str, context: &[ContextPair]) -> Result<String> {
        let prompt = build_prompt(&self.persona, context, user_message);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        tracing::debug!(
            model = %self.model,
            context_pairs = context.len(),
            prompt_len = prompt.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Completion(format!("Completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(ParleyError::Completion(format!(
                "Completion API returned {status}: {error_body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ParleyError::Completion(format!("Invalid completion response: {e}")))?;

        let reply = parse_completion(&payload)?;

        tracing::debug!(reply_len = reply.len(), "Received completion response");

        Ok(reply)
    }
}

/// Extract the reply text from a `generateContent` response payload.
///
/// The first candidate's `content.parts` are concatenated in order. A payload
/// with no candidates, or whose parts carry no text, is a completion error.
fn parse_completion(payload: &Value) -> Result<String> {
    let parts = payload
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            ParleyError::Completion("Completion response has no candidates".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(ParleyError::Completion(
            "Completion response contained no text".to_string(),
        ));
    }
    Ok(text)
}

// =============================================================================
// Tests
// =============================================================================
