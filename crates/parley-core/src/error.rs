use thiserror::Error;

/// Top-level error type for the Parley system.
///
/// Each variant maps to one distinct failure mode of a conversation turn.
/// Subsystem crates return `ParleyError` directly so that the `?` operator
/// works across crate boundaries, and the API layer translates variants to
/// HTTP status codes in exactly one place.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Turn already committed: {id}")]
    DuplicateTurn { id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Empty transcript")]
    EmptyTranscript,

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ParleyError {
    fn from(err: toml::de::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ParleyError {
    fn from(err: toml::ser::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        ParleyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;
