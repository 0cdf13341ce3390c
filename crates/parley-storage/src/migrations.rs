//! Database schema migrations.
//!
//! Applies the initial schema including the turns, users, and
//! schema_migrations tables.

use rusqlite::Connection;
use tracing::info;

use parley_core::error::ParleyError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), ParleyError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ParleyError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ParleyError> {
    conn.execute_batch(
        "
        -- Conversation turns. The primary key doubles as the uniqueness
        -- guard for commits: a second insert with the same id fails.
        CREATE TABLE IF NOT EXISTS turns (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT,
            user_email      TEXT,
            user_message    TEXT NOT NULL,
            ai_response     TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            audio_ref       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_turns_created_at
            ON turns (created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_turns_user_id
            ON turns (user_id, created_at DESC)
            WHERE user_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_turns_user_email
            ON turns (user_email, created_at DESC)
            WHERE user_email IS NOT NULL;

        -- Per-email user profiles. created_at is written once; commits
        -- only advance last_active_at.
        CREATE TABLE IF NOT EXISTS users (
            email           TEXT PRIMARY KEY NOT NULL,
            created_at      INTEGER NOT NULL,
            last_active_at  INTEGER NOT NULL
        );

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
