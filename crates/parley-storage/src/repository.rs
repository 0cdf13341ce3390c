//! Repository implementations for SQLite-backed persistence.
//!
//! Provides TurnRepository and UserRepository operating on the Database
//! struct using raw SQL.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use parley_core::error::ParleyError;
use parley_core::types::{Turn, TurnId, UserIdentity, UserProfile};

use crate::db::Database;

/// Repository for conversation turns.
pub struct TurnRepository {
    db: Arc<Database>,
}

impl TurnRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Commit a turn. The primary key enforces id uniqueness at write time;
    /// a second commit with the same id reports `DuplicateTurn` and leaves
    /// the stored row untouched (first writer wins).
    pub fn commit(&self, turn: &Turn) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO turns (id, user_id, user_email, user_message, ai_response, created_at, audio_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    turn.id.to_string(),
                    turn.user_id,
                    turn.user_email,
                    turn.user_message,
                    turn.ai_response,
                    turn.created_at.timestamp(),
                    turn.audio_ref,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    ParleyError::DuplicateTurn {
                        id: turn.id.to_string(),
                    }
                }
                other => ParleyError::Storage(format!("Failed to commit turn: {}", other)),
            })?;
            Ok(())
        })
    }

    /// Find a turn by ID.
    pub fn find_by_id(&self, id: TurnId) -> Result<Option<Turn>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, user_email, user_message, ai_response, created_at, audio_ref
                     FROM turns WHERE id = ?1",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id.to_string()], |row| Ok(row_to_turn(row)))
                .optional()
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            match result {
                Some(turn) => Ok(Some(turn?)),
                None => Ok(None),
            }
        })
    }

    /// Fetch history for an identity, newest first.
    ///
    /// Ordered by `created_at` descending with ties broken by reverse
    /// insertion order. An absent identity returns ALL turns bounded by
    /// `limit`; there is no access-control filtering at this layer.
    pub fn history(
        &self,
        identity: Option<&UserIdentity>,
        limit: u64,
    ) -> Result<Vec<Turn>, ParleyError> {
        match identity {
            Some(UserIdentity::Id(id)) => self.history_by_user_id(id, limit),
            Some(UserIdentity::Email(email)) => self.history_by_email(email, limit),
            None => self.history_all(limit),
        }
    }

    fn history_by_user_id(&self, user_id: &str, limit: u64) -> Result<Vec<Turn>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, user_email, user_message, ai_response, created_at, audio_ref
                     FROM turns
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| Ok(row_to_turn(row)))
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let turn = row.map_err(|e| ParleyError::Storage(e.to_string()))??;
                turns.push(turn);
            }
            Ok(turns)
        })
    }

    fn history_by_email(&self, email: &str, limit: u64) -> Result<Vec<Turn>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, user_email, user_message, ai_response, created_at, audio_ref
                     FROM turns
                     WHERE user_email = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![email, limit], |row| Ok(row_to_turn(row)))
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let turn = row.map_err(|e| ParleyError::Storage(e.to_string()))??;
                turns.push(turn);
            }
            Ok(turns)
        })
    }

    fn history_all(&self, limit: u64) -> Result<Vec<Turn>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, user_email, user_message, ai_response, created_at, audio_ref
                     FROM turns
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?1",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![limit], |row| Ok(row_to_turn(row)))
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let turn = row.map_err(|e| ParleyError::Storage(e.to_string()))??;
                turns.push(turn);
            }
            Ok(turns)
        })
    }
}

/// Repository for per-email user profiles.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record activity for an email at the given instant.
    ///
    /// Creates the profile with both timestamps on first sight; afterwards
    /// only `last_active_at` advances, `created_at` is never rewritten.
    pub fn record_activity(&self, email: &str, at: DateTime<Utc>) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, created_at, last_active_at)
                 VALUES (?1, ?2, ?2)
                 ON CONFLICT(email) DO UPDATE SET last_active_at = excluded.last_active_at",
                rusqlite::params![email, at.timestamp()],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to record activity: {}", e)))?;
            Ok(())
        })
    }

    /// Find a profile by email.
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT email, created_at, last_active_at FROM users WHERE email = ?1")
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![email], |row| Ok(row_to_profile(row)))
                .optional()
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            match result {
                Some(profile) => Ok(Some(profile?)),
                None => Ok(None),
            }
        })
    }
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> Result<Turn, ParleyError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let user_id: Option<String> = row
        .get(1)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let user_email: Option<String> = row
        .get(2)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let user_message: String = row
        .get(3)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let ai_response: String = row
        .get(4)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let created_at_i64: i64 = row
        .get(5)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let audio_ref: Option<String> = row
        .get(6)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;

    Ok(Turn {
        id: TurnId(
            Uuid::parse_str(&id_str)
                .map_err(|e| ParleyError::Storage(format!("Invalid UUID: {}", e)))?,
        ),
        user_id,
        user_email,
        user_message,
        ai_response,
        created_at: Utc
            .timestamp_opt(created_at_i64, 0)
            .single()
            .unwrap_or_default(),
        audio_ref,
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> Result<UserProfile, ParleyError> {
    let email: String = row
        .get(0)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let created_at_i64: i64 = row
        .get(1)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;
    let last_active_i64: i64 = row
        .get(2)
        .map_err(|e| ParleyError::Storage(e.to_string()))?;

    Ok(UserProfile {
        email,
        created_at: Utc
            .timestamp_opt(created_at_i64, 0)
            .single()
            .unwrap_or_default(),
        last_active_at: Utc
            .timestamp_opt(last_active_i64, 0)
            .single()
            .unwrap_or_default(),
    })
}

/// Extension trait for rusqlite to support optional query results.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
