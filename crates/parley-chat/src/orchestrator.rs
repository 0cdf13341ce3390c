//! Turn orchestrator: drives a turn through its lifecycle.
//!
//! Lifecycle: receive, transcribe (voice only), build context, complete,
//! synthesize, commit. The orchestrator owns the failure policy at each
//! step: transcription and completion failures abort the turn, while
//! synthesis and artifact-write failures degrade it to text-only.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use parley_core::config::ChatConfig;
use parley_core::{ArtifactRole, ParleyError, Result, Turn, TurnId, UserIdentity};
use parley_llm::CompletionService;
use parley_speech::{SynthesisService, TranscriptionService};
use parley_storage::{AudioStore, TurnRepository, UserRepository};

use crate::context::ContextAssembler;

/// Outcome of a committed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Identifier the turn was committed under.
    pub turn_id: TurnId,
    /// Assistant reply text.
    pub response: String,
    /// Response-artifact file name, when synthesis succeeded.
    pub audio_ref: Option<String>,
}

/// Central coordinator wiring storage, completion, and speech services.
///
/// All capabilities are injected at construction; the orchestrator holds no
/// global state and no locks of its own.
pub struct TurnOrchestrator {
    turns: Arc<TurnRepository>,
    users: Arc<UserRepository>,
    audio: Arc<AudioStore>,
    completion: Arc<dyn CompletionService>,
    transcription: Arc<dyn TranscriptionService>,
    synthesis: Arc<dyn SynthesisService>,
    assembler: ContextAssembler,
}

impl TurnOrchestrator {
    pub fn new(
        turns: Arc<TurnRepository>,
        users: Arc<UserRepository>,
        audio: Arc<AudioStore>,
        completion: Arc<dyn CompletionService>,
        transcription: Arc<dyn TranscriptionService>,
        synthesis: Arc<dyn SynthesisService>,
        config: &ChatConfig,
    ) -> Self {
        let assembler = ContextAssembler::new(
            Arc::clone(&turns),
            config.context_window,
            config.history_fetch_limit,
        );

        Self {
            turns,
            users,
            audio,
            completion,
            transcription,
            synthesis,
            assembler,
        }
    }

    /// Run a text turn end to end.
    pub async fn handle_text(
        &self,
        message: &str,
        user_id: Option<String>,
        user_email: Option<String>,
    ) -> Result<TurnOutcome> {
        if message.trim().is_empty() {
            return Err(ParleyError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        let turn_id = TurnId::new();
        debug!(%turn_id, "Received text turn");

        self.run_turn(turn_id, message.to_string(), user_id, user_email)
            .await
    }

    /// Run a voice turn end to end.
    ///
    /// The audio is transcribed first; a transcript that is empty after
    /// trimming aborts the turn with an empty-transcript error before
    /// anything is stored. On success the input audio is kept as the `input`
    /// artifact best-effort.
    pub async fn handle_voice(
        &self,
        audio: &[u8],
        user_id: Option<String>,
        user_email: Option<String>,
    ) -> Result<TurnOutcome> {
        let turn_id = TurnId::new();
        debug!(%turn_id, audio_bytes = audio.len(), "Received voice turn");

        let transcript = self.transcription.transcribe(audio).await?;
        info!(%turn_id, transcript_len = transcript.len(), "Transcribed voice input");

        if let Err(e) = self.audio.put(turn_id, ArtifactRole::Input, audio) {
            warn!(%turn_id, error = %e, "Failed to store input audio artifact");
        }

        self.run_turn(turn_id, transcript, user_id, user_email)
            .await
    }

    /// The shared tail of the lifecycle: context, completion, synthesis,
    /// commit.
    async fn run_turn(
        &self,
        turn_id: TurnId,
        user_message: String,
        user_id: Option<String>,
        user_email: Option<String>,
    ) -> Result<TurnOutcome> {
        let user_id = normalize(user_id);
        let user_email = normalize(user_email);
        let identity = UserIdentity::from_parts(user_id.clone(), user_email.clone());

        let context = self.assembler.build_context(identity.as_ref())?;
        debug!(%turn_id, context_pairs = context.len(), "Assembled context");

        let response = self.completion.complete(&user_message, &context).await?;

        // Two-phase write: artifacts land on disk before the row commits.
        // If the commit fails now, the orphaned files are tolerated garbage;
        // there is no rollback and no GC pass.
        let audio_ref = self.synthesize_and_store(&response, turn_id).await;

        let turn = Turn {
            id: turn_id,
            user_id,
            user_email,
            user_message,
            ai_response: response,
            created_at: Utc::now(),
            audio_ref,
        };
        self.commit_turn(&turn)?;

        info!(%turn_id, has_audio = turn.audio_ref.is_some(), "Committed turn");

        Ok(TurnOutcome {
            turn_id,
            response: turn.ai_response,
            audio_ref: turn.audio_ref,
        })
    }

    /// Synthesize the reply and store it as the `response` artifact.
    ///
    /// Both the remote call and the artifact write are best-effort: on any
    /// failure the turn commits text-only and the caller simply gets no
    /// audio reference.
    async fn synthesize_and_store(&self, text: &str, turn_id: TurnId) -> Option<String> {
        let bytes = match self.synthesis.synthesize(text).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%turn_id, error = %e, "Synthesis failed; committing turn without audio");
                return None;
            }
        };

        match self.audio.put(turn_id, ArtifactRole::Response, &bytes) {
            Ok(file_name) => Some(file_name),
            Err(e) => {
                warn!(%turn_id, error = %e, "Failed to store response audio artifact");
                None
            }
        }
    }

    /// Commit the turn row and upsert the user profile.
    ///
    /// A duplicate id means this turn already committed (an in-flight retry
    /// of the same id); the first write stands and the turn is reported as
    /// committed.
    fn commit_turn(&self, turn: &Turn) -> Result<()> {
        match self.turns.commit(turn) {
            Ok(()) => {}
            Err(ParleyError::DuplicateTurn { id }) => {
                warn!(turn_id = %id, "Turn already committed; keeping the first write");
            }
            Err(e) => return Err(e),
        }

        if let Some(email) = &turn.user_email {
            self.users.record_activity(email, turn.created_at)?;
        }

        Ok(())
    }
}

/// Treat an empty identity field as absent, so the row and the tagged
/// identity agree on what was supplied.
fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parley_llm::MockCompletion;
    use parley_speech::{MockSynthesis, MockTranscription};
    use parley_storage::Database;
    use tempfile::TempDir;

    struct Harness {
        orchestrator: TurnOrchestrator,
        turns: Arc<TurnRepository>,
        users: Arc<UserRepository>,
        audio: Arc<AudioStore>,
        _dir: TempDir,
    }

    fn make_harness(
        completion: Arc<dyn CompletionService>,
        transcription: Arc<dyn TranscriptionService>,
        synthesis: Arc<dyn SynthesisService>,
    ) -> Harness {
        let db = Arc::new(Database::in_memory().unwrap());
        let turns = Arc::new(TurnRepository::new(Arc::clone(&db)));
        let users = Arc::new(UserRepository::new(db));
        let dir = tempfile::tempdir().unwrap();
        let audio = Arc::new(AudioStore::new(dir.path()).unwrap());

        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&turns),
            Arc::clone(&users),
            Arc::clone(&audio),
            completion,
            transcription,
            synthesis,
            &ChatConfig::default(),
        );

        Harness {
            orchestrator,
            turns,
            users,
            audio,
            _dir: dir,
        }
    }

    fn default_harness() -> Harness {
        make_harness(
            Arc::new(MockCompletion::new("Happy to help.")),
            Arc::new(MockTranscription::new("spoken message")),
            Arc::new(MockSynthesis::new(vec![0xFF, 0xFB, 0x90, 0x00])),
        )
    }

    // ---- text turns ----

    #[tokio::test]
    async fn test_text_turn_commits_and_returns_reply() {
        let h = default_harness();

        let outcome = h
            .orchestrator
            .handle_text("Hello", None, None)
            .await
            .unwrap();

        assert_eq!(outcome.response, "Happy to help.");
        assert_eq!(
            outcome.audio_ref.as_deref(),
            Some(format!("response_{}.mp3", outcome.turn_id).as_str())
        );

        let row = h.turns.find_by_id(outcome.turn_id).unwrap().unwrap();
        assert_eq!(row.user_message, "Hello");
        assert_eq!(row.ai_response, "Happy to help.");
        assert_eq!(row.audio_ref, outcome.audio_ref);

        let stored = h.audio.get(outcome.turn_id).unwrap();
        assert_eq!(stored, vec![0xFF, 0xFB, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let h = default_harness();

        for message in ["", "   ", "\n\t"] {
            let result = h.orchestrator.handle_text(message, None, None).await;
            assert!(matches!(result, Err(ParleyError::InvalidInput(_))));
        }
        assert!(h.turns.history(None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_turn_stores_no_input_artifact() {
        let h = default_harness();
        let outcome = h
            .orchestrator
            .handle_text("Hello", None, None)
            .await
            .unwrap();

        let input_path = h
            .audio
            .dir()
            .join(format!("input_{}.mp3", outcome.turn_id));
        assert!(!input_path.exists());
    }

    // ---- failure policy ----

    #[tokio::test]
    async fn test_completion_failure_commits_nothing() {
        let h = make_harness(
            Arc::new(MockCompletion::failing()),
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        let result = h.orchestrator.handle_text("Hello", None, None).await;
        assert!(matches!(result, Err(ParleyError::Completion(_))));
        assert!(h.turns.history(None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_commits_text_only() {
        let h = make_harness(
            Arc::new(MockCompletion::new("Reply.")),
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::failing()),
        );

        let outcome = h
            .orchestrator
            .handle_text("Hello", None, None)
            .await
            .unwrap();
        assert_eq!(outcome.response, "Reply.");
        assert!(outcome.audio_ref.is_none());

        let row = h.turns.find_by_id(outcome.turn_id).unwrap().unwrap();
        assert!(row.audio_ref.is_none());
        assert!(matches!(
            h.audio.get(outcome.turn_id),
            Err(ParleyError::NotFound(_))
        ));
    }

    // ---- voice turns ----

    #[tokio::test]
    async fn test_voice_turn_commits_transcript() {
        let h = default_harness();

        let outcome = h
            .orchestrator
            .handle_voice(b"wav bytes", None, None)
            .await
            .unwrap();

        let row = h.turns.find_by_id(outcome.turn_id).unwrap().unwrap();
        assert_eq!(row.user_message, "spoken message");
        assert_eq!(row.ai_response, "Happy to help.");
    }

    #[tokio::test]
    async fn test_voice_turn_stores_input_artifact() {
        let h = default_harness();

        let outcome = h
            .orchestrator
            .handle_voice(b"wav bytes", None, None)
            .await
            .unwrap();

        let input_path = h
            .audio
            .dir()
            .join(format!("input_{}.mp3", outcome.turn_id));
        assert_eq!(std::fs::read(input_path).unwrap(), b"wav bytes");

        // The response role still wins artifact reads for the turn.
        assert_eq!(h.audio.get(outcome.turn_id).unwrap(), vec![0xFF, 0xFB, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_voice_turn_empty_transcript_aborts_before_storage() {
        let h = make_harness(
            Arc::new(MockCompletion::new("unused")),
            Arc::new(MockTranscription::new("   ")),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        let result = h.orchestrator.handle_voice(b"noise", None, None).await;
        assert!(matches!(result, Err(ParleyError::EmptyTranscript)));
        assert!(h.turns.history(None, 10).unwrap().is_empty());
        assert_eq!(std::fs::read_dir(h.audio.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_voice_turn_transcription_failure_is_fatal() {
        let h = make_harness(
            Arc::new(MockCompletion::new("unused")),
            Arc::new(MockTranscription::failing()),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        let result = h.orchestrator.handle_voice(b"audio", None, None).await;
        assert!(matches!(result, Err(ParleyError::Transcription(_))));
        assert!(h.turns.history(None, 10).unwrap().is_empty());
    }

    // ---- context assembly ----

    #[tokio::test]
    async fn test_context_grows_chronologically() {
        let completion = Arc::new(MockCompletion::new("reply"));
        let h = make_harness(
            Arc::clone(&completion) as Arc<dyn CompletionService>,
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        h.orchestrator
            .handle_text("first", None, None)
            .await
            .unwrap();
        h.orchestrator
            .handle_text("second", None, None)
            .await
            .unwrap();
        h.orchestrator
            .handle_text("third", None, None)
            .await
            .unwrap();

        let calls = completion.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].1.is_empty());
        assert_eq!(calls[1].1.len(), 1);
        assert_eq!(calls[1].1[0].user_message, "first");

        let third_context: Vec<&str> = calls[2]
            .1
            .iter()
            .map(|p| p.user_message.as_str())
            .collect();
        assert_eq!(third_context, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_context_respects_window() {
        let completion = Arc::new(MockCompletion::new("reply"));
        let db = Arc::new(Database::in_memory().unwrap());
        let turns = Arc::new(TurnRepository::new(Arc::clone(&db)));
        let users = Arc::new(UserRepository::new(db));
        let dir = tempfile::tempdir().unwrap();
        let audio = Arc::new(AudioStore::new(dir.path()).unwrap());

        let config = ChatConfig {
            context_window: 1,
            history_fetch_limit: 5,
            persona: None,
        };
        let orchestrator = TurnOrchestrator::new(
            turns,
            users,
            audio,
            Arc::clone(&completion) as Arc<dyn CompletionService>,
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::new(vec![1])),
            &config,
        );

        for message in ["first", "second", "third"] {
            orchestrator.handle_text(message, None, None).await.unwrap();
        }

        let calls = completion.calls();
        assert_eq!(calls[2].1.len(), 1);
        assert_eq!(calls[2].1[0].user_message, "second");
    }

    #[tokio::test]
    async fn test_context_is_filtered_by_identity() {
        let completion = Arc::new(MockCompletion::new("reply"));
        let h = make_harness(
            Arc::clone(&completion) as Arc<dyn CompletionService>,
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        h.orchestrator
            .handle_text("alice one", None, Some("alice@example.com".to_string()))
            .await
            .unwrap();
        h.orchestrator
            .handle_text("bob one", None, Some("bob@example.com".to_string()))
            .await
            .unwrap();
        h.orchestrator
            .handle_text("alice two", None, Some("alice@example.com".to_string()))
            .await
            .unwrap();

        let calls = completion.calls();
        let alice_context = &calls[2].1;
        assert_eq!(alice_context.len(), 1);
        assert_eq!(alice_context[0].user_message, "alice one");
    }

    #[tokio::test]
    async fn test_anonymous_context_sees_all_turns() {
        let completion = Arc::new(MockCompletion::new("reply"));
        let h = make_harness(
            Arc::clone(&completion) as Arc<dyn CompletionService>,
            Arc::new(MockTranscription::new("spoken")),
            Arc::new(MockSynthesis::new(vec![1])),
        );

        h.orchestrator
            .handle_text("alice asks", None, Some("alice@example.com".to_string()))
            .await
            .unwrap();
        h.orchestrator
            .handle_text("anonymous asks", None, None)
            .await
            .unwrap();

        let calls = completion.calls();
        assert_eq!(calls[1].1.len(), 1);
        assert_eq!(calls[1].1[0].user_message, "alice asks");
    }

    // ---- identity and profiles ----

    #[tokio::test]
    async fn test_profile_created_on_first_email_commit() {
        let h = default_harness();

        h.orchestrator
            .handle_text("Hello", None, Some("alice@example.com".to_string()))
            .await
            .unwrap();

        let profile = h
            .users
            .find_by_email("alice@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.created_at, profile.last_active_at);
    }

    #[tokio::test]
    async fn test_profile_activity_advances_created_at_stays() {
        let h = default_harness();
        let email = "alice@example.com";

        h.orchestrator
            .handle_text("first", None, Some(email.to_string()))
            .await
            .unwrap();
        let first = h.users.find_by_email(email).unwrap().unwrap();

        h.orchestrator
            .handle_text("second", None, Some(email.to_string()))
            .await
            .unwrap();
        let second = h.users.find_by_email(email).unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.last_active_at >= first.last_active_at);
    }

    #[tokio::test]
    async fn test_no_profile_without_email() {
        let h = default_harness();

        h.orchestrator
            .handle_text("Hello", Some("user-1".to_string()), None)
            .await
            .unwrap();

        assert!(h.users.find_by_email("user-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_identity_fields_are_dropped() {
        let h = default_harness();

        let outcome = h
            .orchestrator
            .handle_text("Hello", Some(String::new()), Some(String::new()))
            .await
            .unwrap();

        let row = h.turns.find_by_id(outcome.turn_id).unwrap().unwrap();
        assert!(row.user_id.is_none());
        assert!(row.user_email.is_none());
    }

    // ---- duplicate commits ----

    #[tokio::test]
    async fn test_duplicate_commit_is_absorbed() {
        let h = default_harness();

        let turn = Turn {
            id: TurnId::new(),
            user_id: None,
            user_email: None,
            user_message: "original".to_string(),
            ai_response: "first write".to_string(),
            created_at: Utc::now(),
            audio_ref: None,
        };
        h.orchestrator.commit_turn(&turn).unwrap();

        let retry = Turn {
            ai_response: "second write".to_string(),
            ..turn.clone()
        };
        h.orchestrator.commit_turn(&retry).unwrap();

        let row = h.turns.find_by_id(turn.id).unwrap().unwrap();
        assert_eq!(row.ai_response, "first write");
    }
}
