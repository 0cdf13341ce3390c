//! Application state shared across all route handlers.
//!
//! AppState holds the orchestrator and the shared storage handles. It is
//! passed to handlers via axum's State extractor.

use std::sync::Arc;

use parley_chat::TurnOrchestrator;
use parley_storage::{AudioStore, Database, TurnRepository};

/// Shared application state.
///
/// All fields are `Arc` handles, so cloning per request is cheap. The
/// orchestrator owns turn execution; the repositories back the read-side
/// endpoints directly.
#[derive(Clone)]
pub struct AppState {
    /// Drives the turn lifecycle for `/chat` and `/voice`.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Read access to committed turns for `/conversations`.
    pub turns: Arc<TurnRepository>,
    /// Connectivity check target for `/health`.
    pub database: Arc<Database>,
    /// Stored audio artifacts for `/audio/{conversation_id}`.
    pub audio: Arc<AudioStore>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<TurnOrchestrator>,
        turns: Arc<TurnRepository>,
        database: Arc<Database>,
        audio: Arc<AudioStore>,
    ) -> Self {
        Self {
            orchestrator,
            turns,
            database,
            audio,
        }
    }
}
