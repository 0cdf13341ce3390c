//! HTTP surface for the parley service.
//!
//! Exposes turn endpoints (`/chat`, `/voice`), artifact downloads
//! (`/audio/{conversation_id}`), history (`/conversations`), and `/health`
//! over axum, backed by the orchestrator and repositories in [`AppState`].

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
