//! Conversation context assembly.
//!
//! Selects the prior turns that accompany a completion request. The store
//! returns history newest-first; the assembler keeps the most recent
//! `window` turns of the fetched set and re-orders them chronologically, so
//! the prompt always reads oldest to newest.

use std::sync::Arc;

use parley_core::{ContextPair, Result, UserIdentity};
use parley_storage::TurnRepository;

/// Builds the context pairs for a completion.
pub struct ContextAssembler {
    turns: Arc<TurnRepository>,
    window: usize,
    fetch_limit: usize,
}

impl ContextAssembler {
    pub fn new(turns: Arc<TurnRepository>, window: usize, fetch_limit: usize) -> Self {
        Self {
            turns,
            window,
            fetch_limit,
        }
    }

    /// The most recent `window` prior turns for this identity, oldest first.
    ///
    /// An empty history yields an empty context, never an error. An absent
    /// identity draws on the full unfiltered history.
    pub fn build_context(&self, identity: Option<&UserIdentity>) -> Result<Vec<ContextPair>> {
        let recent = self.turns.history(identity, self.fetch_limit as u64)?;

        let mut pairs: Vec<ContextPair> = recent
            .iter()
            .take(self.window)
            .map(ContextPair::from)
            .collect();
        pairs.reverse();

        Ok(pairs)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parley_core::{Turn, TurnId};
    use parley_storage::Database;

    fn make_repo() -> Arc<TurnRepository> {
        let db = Arc::new(Database::in_memory().unwrap());
        Arc::new(TurnRepository::new(db))
    }

    fn seed_turn(repo: &TurnRepository, message: &str, reply: &str, at_epoch: i64) -> TurnId {
        let turn = Turn {
            id: TurnId::new(),
            user_id: None,
            user_email: Some("alice@example.com".to_string()),
            user_message: message.to_string(),
            ai_response: reply.to_string(),
            created_at: Utc.timestamp_opt(at_epoch, 0).single().unwrap(),
            audio_ref: None,
        };
        repo.commit(&turn).unwrap();
        turn.id
    }

    #[test]
    fn test_empty_history_yields_empty_context() {
        let repo = make_repo();
        let assembler = ContextAssembler::new(Arc::clone(&repo), 3, 5);

        let context = assembler.build_context(None).unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_context_is_chronological() {
        let repo = make_repo();
        seed_turn(&repo, "first", "one", 1000);
        seed_turn(&repo, "second", "two", 2000);
        seed_turn(&repo, "third", "three", 3000);

        let assembler = ContextAssembler::new(Arc::clone(&repo), 3, 5);
        let context = assembler.build_context(None).unwrap();

        let messages: Vec<&str> = context.iter().map(|p| p.user_message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(context[0].ai_response, "one");
    }

    #[test]
    fn test_window_keeps_most_recent_turns() {
        let repo = make_repo();
        for i in 0..6 {
            seed_turn(&repo, &format!("msg-{i}"), &format!("reply-{i}"), 1000 + i);
        }

        let assembler = ContextAssembler::new(Arc::clone(&repo), 3, 5);
        let context = assembler.build_context(None).unwrap();

        // Six turns seeded, three kept: the newest three, oldest first.
        let messages: Vec<&str> = context.iter().map(|p| p.user_message.as_str()).collect();
        assert_eq!(messages, vec!["msg-3", "msg-4", "msg-5"]);
    }

    #[test]
    fn test_window_larger_than_history() {
        let repo = make_repo();
        seed_turn(&repo, "only", "reply", 1000);

        let assembler = ContextAssembler::new(Arc::clone(&repo), 3, 5);
        let context = assembler.build_context(None).unwrap();
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_context_filters_by_identity() {
        let repo = make_repo();
        seed_turn(&repo, "alice asks", "alice reply", 1000);

        let turn = Turn {
            id: TurnId::new(),
            user_id: None,
            user_email: Some("bob@example.com".to_string()),
            user_message: "bob asks".to_string(),
            ai_response: "bob reply".to_string(),
            created_at: Utc.timestamp_opt(2000, 0).single().unwrap(),
            audio_ref: None,
        };
        repo.commit(&turn).unwrap();

        let assembler = ContextAssembler::new(Arc::clone(&repo), 3, 5);
        let identity = UserIdentity::Email("alice@example.com".to_string());
        let context = assembler.build_context(Some(&identity)).unwrap();

        assert_eq!(context.len(), 1);
        assert_eq!(context[0].user_message, "alice asks");
    }

    #[test]
    fn test_zero_window_yields_empty_context() {
        let repo = make_repo();
        seed_turn(&repo, "msg", "reply", 1000);

        let assembler = ContextAssembler::new(Arc::clone(&repo), 0, 5);
        let context = assembler.build_context(None).unwrap();
        assert!(context.is_empty());
    }
}
