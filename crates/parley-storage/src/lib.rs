//! Parley Storage crate - SQLite persistence and audio artifacts.
//!
//! Provides a WAL-mode SQLite database with migrations, repositories for
//! conversation turns and user profiles, and a write-once filesystem store
//! for per-turn audio artifacts.

pub mod blob;
pub mod db;
pub mod migrations;
pub mod repository;

pub use blob::AudioStore;
pub use db::Database;
pub use repository::{TurnRepository, UserRepository};
