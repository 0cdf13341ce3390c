//! Parley chat crate - turn lifecycle orchestration.
//!
//! Wires the conversation store, completion client, and speech adapters into
//! a single coordinator that drives each turn from receipt to commit.

pub mod context;
pub mod orchestrator;

pub use context::ContextAssembler;
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
