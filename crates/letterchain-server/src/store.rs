//! SQLite-backed stores.
//!
//! One shared connection behind a mutex, WAL mode, schema embedded at
//! compile time. The session store's `mark_validated` is a conditional
//! `UPDATE ... WHERE is_validated = 0`; the reported row count is the
//! single source of truth for winning the validation race, so two
//! concurrent submissions for one token can never both pass.

// SQLite reports counts as i64; scores and counts fit comfortably.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use letterchain_core::iptrack::ActivityLog;
use letterchain_core::leaderboard::{
    clamp_limit, LeaderboardEntry, LeaderboardError, LeaderboardStore, NewEntry,
};
use letterchain_core::session::{SessionRecord, SessionStore, SessionStoreError};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors raised while opening the database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Shared handle to the single SQLite connection.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Opens (or creates) the database, enables WAL mode, and applies the
/// schema.
///
/// # Errors
///
/// Returns a [`StoreError`] if the file cannot be opened or the schema
/// fails to apply.
pub fn open_database(path: &Path) -> Result<SharedConnection, StoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database for tests.
///
/// # Errors
///
/// Returns a [`StoreError`] if the schema fails to apply.
pub fn open_in_memory() -> Result<SharedConnection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn lock(conn: &SharedConnection) -> std::sync::MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn backend_err(err: rusqlite::Error) -> SessionStoreError {
    SessionStoreError::Backend(err.to_string())
}

/// [`SessionStore`] over the shared SQLite connection.
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: SharedConnection,
}

impl SqliteSessionStore {
    /// Wraps the shared connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore {
    fn create(
        &self,
        token: &str,
        language: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let conn = lock(&self.conn);
        let result = conn.execute(
            "INSERT INTO game_sessions (session_token, language, started_at) \
             VALUES (?1, ?2, ?3)",
            params![token, language, started_at.to_rfc3339()],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(SessionStoreError::DuplicateToken)
            },
            Err(e) => Err(backend_err(e)),
        }
    }

    fn get(&self, token: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let conn = lock(&self.conn);
        conn.query_row(
            "SELECT session_token, language, started_at, ended_at, words_played, \
                    is_validated, final_score \
             FROM game_sessions WHERE session_token = ?1",
            params![token],
            |row| {
                let started_at: String = row.get(2)?;
                let ended_at: Option<String> = row.get(3)?;
                let words_played: String = row.get(4)?;
                let final_score: Option<i64> = row.get(6)?;
                Ok(SessionRecord {
                    session_token: row.get(0)?,
                    language: row.get(1)?,
                    started_at: parse_timestamp(&started_at),
                    ended_at: ended_at.as_deref().map(parse_timestamp),
                    words_played: serde_json::from_str(&words_played).unwrap_or_default(),
                    is_validated: row.get::<_, i64>(5)? != 0,
                    final_score: final_score.map(|s| s as u32),
                })
            },
        )
        .optional()
        .map_err(backend_err)
    }

    fn mark_validated(
        &self,
        token: &str,
        ended_at: DateTime<Utc>,
        words: &[String],
        score: u32,
    ) -> Result<bool, SessionStoreError> {
        let words_json =
            serde_json::to_string(words).map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        let conn = lock(&self.conn);
        let changed = conn
            .execute(
                "UPDATE game_sessions \
                 SET is_validated = 1, ended_at = ?2, words_played = ?3, final_score = ?4 \
                 WHERE session_token = ?1 AND is_validated = 0",
                params![token, ended_at.to_rfc3339(), words_json, score],
            )
            .map_err(backend_err)?;
        Ok(changed == 1)
    }
}

/// [`LeaderboardStore`] over the shared SQLite connection.
#[derive(Clone)]
pub struct SqliteLeaderboardStore {
    conn: SharedConnection,
}

impl SqliteLeaderboardStore {
    /// Wraps the shared connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl LeaderboardStore for SqliteLeaderboardStore {
    fn insert(&self, entry: &NewEntry) -> Result<(), LeaderboardError> {
        let conn = lock(&self.conn);
        conn.execute(
            "INSERT INTO leaderboard \
             (player_name, score, words_count, longest_chain, game_duration_seconds, \
              language, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.sanitized_name(),
                entry.score,
                entry.words_count,
                entry.longest_chain,
                entry.game_duration_seconds,
                entry.language,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| LeaderboardError::Backend(e.to_string()))?;
        Ok(())
    }

    fn top_n(
        &self,
        limit: usize,
        language: &str,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let conn = lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, player_name, score, words_count, longest_chain, \
                        game_duration_seconds, language, created_at \
                 FROM leaderboard WHERE language = ?1 \
                 ORDER BY score DESC LIMIT ?2",
            )
            .map_err(|e| LeaderboardError::Backend(e.to_string()))?;

        let limit = i64::try_from(clamp_limit(limit)).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![language, limit], |row| {
                let created_at: String = row.get(7)?;
                Ok(LeaderboardEntry {
                    id: row.get(0)?,
                    player_name: row.get(1)?,
                    score: row.get::<_, i64>(2)? as u32,
                    words_count: row.get::<_, i64>(3)? as u32,
                    longest_chain: row.get::<_, i64>(4)? as u32,
                    game_duration_seconds: row.get::<_, i64>(5)? as u32,
                    language: row.get(6)?,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .map_err(|e| LeaderboardError::Backend(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LeaderboardError::Backend(e.to_string()))
    }
}

/// Persistent [`ActivityLog`] backed by the `suspicious_activity` table.
///
/// Logging failures are swallowed after a warning; observability must not
/// take a request down with it.
#[derive(Clone)]
pub struct SqliteActivityLog {
    conn: SharedConnection,
}

impl SqliteActivityLog {
    /// Wraps the shared connection.
    #[must_use]
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl ActivityLog for SqliteActivityLog {
    fn record(&self, ip: &str, user_agent: &str, reason: &str, metadata: serde_json::Value) {
        let conn = lock(&self.conn);
        let result = conn.execute(
            "INSERT INTO suspicious_activity \
             (ip_address, user_agent, reason, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ip,
                user_agent,
                reason,
                metadata.to_string(),
                Utc::now().to_rfc3339(),
            ],
        );
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to record suspicious activity");
        }
    }
}

/// Parses a stored RFC 3339 timestamp, falling back to the epoch for rows
/// written by hand or by older builds.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
