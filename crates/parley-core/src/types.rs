use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Which side of a turn an audio artifact belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// Audio the user submitted (the voice recording that was transcribed).
    Input,
    /// Audio synthesized from the assistant's reply.
    Response,
}

impl ArtifactRole {
    /// Returns the file-name prefix used when storing this artifact.
    pub fn file_prefix(&self) -> &str {
        match self {
            ArtifactRole::Input => "input",
            ArtifactRole::Response => "response",
        }
    }
}

/// Caller identity attached to a turn.
///
/// A turn carries at most one identity. When a request supplies both a
/// user id and an email, the id wins; the email is still stored on the
/// turn row but filtering and context assembly key on the id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIdentity {
    /// Opaque external identifier.
    Id(String),
    /// Email address.
    Email(String),
}

impl UserIdentity {
    /// Build an identity from optional request fields, id taking precedence.
    ///
    /// Returns `None` when neither field is present; anonymous turns are
    /// valid and simply unfiltered.
    pub fn from_parts(user_id: Option<String>, user_email: Option<String>) -> Option<Self> {
        match (user_id, user_email) {
            (Some(id), _) if !id.is_empty() => Some(UserIdentity::Id(id)),
            (_, Some(email)) if !email.is_empty() => Some(UserIdentity::Email(email)),
            _ => None,
        }
    }

    /// The raw identity value, whichever variant holds it.
    pub fn value(&self) -> &str {
        match self {
            UserIdentity::Id(v) => v,
            UserIdentity::Email(v) => v,
        }
    }
}

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Unique identifier for a conversation turn.
///
/// Assigned once at receipt, before any remote call, and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Entities
// =============================================================================

/// One complete conversation turn: a user message and the assistant's reply.
///
/// `created_at` is assigned at commit time, not at receipt, so history
/// ordering reflects when turns became durable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
    /// File name of the stored response audio, when synthesis succeeded.
    pub audio_ref: Option<String>,
}

/// Per-email user profile, upserted on every commit that carries an email.
///
/// `created_at` is set exactly once; `last_active_at` advances on each
/// subsequent commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// One prior exchange serialized into a completion prompt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextPair {
    pub user_message: String,
    pub ai_response: String,
}

impl From<&Turn> for ContextPair {
    fn from(turn: &Turn) -> Self {
        Self {
            user_message: turn.user_message.clone(),
            ai_response: turn.ai_response.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
