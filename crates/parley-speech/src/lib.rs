//! Parley speech crate - speech-to-text and text-to-speech adapters.
//!
//! Provides trait-based abstractions over the remote speech services, the
//! ElevenLabs clients that implement them, and mock implementations for
//! testing without network access.

use async_trait::async_trait;

use parley_core::{ParleyError, Result};

pub mod synthesize;
pub mod transcribe;

pub use synthesize::{ElevenLabsSynthesizer, VOICE_ID_ENV};
pub use transcribe::ElevenLabsTranscriber;

// =============================================================================
// Traits
// =============================================================================

/// Service converting recorded audio into text.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe audio bytes into text.
    ///
    /// Returns [`ParleyError::EmptyTranscript`] when the service answered but
    /// the transcript is empty after trimming, and
    /// [`ParleyError::Transcription`] for transport and HTTP failures.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Service converting reply text into audio.
#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// Synthesize MP3 audio for the given text.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// Mock transcription service returning a fixed transcript.
///
/// Mirrors the real adapter's edge behavior: a transcript that is empty
/// after trimming comes back as an empty-transcript error.
#[derive(Debug, Clone, Default)]
pub struct MockTranscription {
    transcript: String,
    fail: bool,
}

impl MockTranscription {
    /// Mock that transcribes every input to `transcript`.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            fail: false,
        }
    }

    /// Mock that fails every call with a transcription error.
    pub fn failing() -> Self {
        Self {
            transcript: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TranscriptionService for MockTranscription {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if self.fail {
            return Err(ParleyError::Transcription(
                "mock transcription failure".to_string(),
            ));
        }
        if audio.is_empty() {
            return Err(ParleyError::Transcription(
                "Cannot transcribe empty audio".to_string(),
            ));
        }
        let transcript = self.transcript.trim();
        if transcript.is_empty() {
            return Err(ParleyError::EmptyTranscript);
        }
        Ok(transcript.to_string())
    }
}

/// Mock synthesis service returning fixed audio bytes.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesis {
    audio: Vec<u8>,
    fail: bool,
}

impl MockSynthesis {
    /// Mock that synthesizes every input to `audio`.
    pub fn new(audio: Vec<u8>) -> Self {
        Self { audio, fail: false }
    }

    /// Mock that fails every call with a synthesis error.
    pub fn failing() -> Self {
        Self {
            audio: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SynthesisService for MockSynthesis {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(ParleyError::Synthesis("mock synthesis failure".to_string()));
        }
        if text.is_empty() {
            return Err(ParleyError::Synthesis(
                "Cannot synthesize empty text".to_string(),
            ));
        }
        Ok(self.audio.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
