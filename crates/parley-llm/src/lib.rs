//! Parley LLM crate - one-shot text completion under a fixed persona.
//!
//! Provides the trait-based abstraction the orchestrator completes turns
//! through, the Gemini REST client that implements it, the prompt assembly
//! logic, and a mock implementation for testing without network access.

use std::sync::Mutex;

use async_trait::async_trait;

use parley_core::{ContextPair, ParleyError, Result};

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;
pub use prompt::{build_prompt, DEFAULT_PERSONA};

// =============================================================================
// Trait
// =============================================================================

/// Service producing the assistant reply for a turn.
///
/// Implementations render the persona, the context pairs, and the current
/// message into a single prompt and return the model's reply text. A failure
/// here is fatal to the turn; callers do not retry.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete one turn.
    ///
    /// # Arguments
    /// * `user_message` - the current message, typed or transcribed.
    /// * `context` - prior turns, oldest first.
    async fn complete(&self, user_message: &str, context: &[ContextPair]) -> Result<String>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock completion service returning a canned reply.
///
/// Records every call so tests can assert on the message and context the
/// orchestrator passed in.
#[derive(Debug, Default)]
pub struct MockCompletion {
    reply: String,
    fail: bool,
    calls: Mutex<Vec<(String, Vec<ContextPair>)>>,
}

impl MockCompletion {
    /// Mock that replies with `reply` on every call.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that fails every call with a completion error.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All `(user_message, context)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, Vec<ContextPair>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, user_message: &str, context: &[ContextPair]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((user_message.to_string(), context.to_vec()));
        }
        if self.fail {
            return Err(ParleyError::Completion(
                "mock completion failure".to_string(),
            ));
        }
        Ok(self.reply.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
