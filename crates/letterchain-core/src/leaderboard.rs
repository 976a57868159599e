//! Leaderboard entries and the store interface.
//!
//! Entries are write-once: inserted after a submission clears the
//! validator, the score check, and the submission gate, and never mutated
//! afterwards. Reads are ordered by score descending and filtered by
//! language, with the page size capped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest player name stored, in characters.
pub const MAX_PLAYER_NAME_CHARS: usize = 20;

/// Hard cap on how many entries a single read may return.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Clamps a requested page size to `1..=MAX_LEADERBOARD_LIMIT`.
#[must_use]
pub fn clamp_limit(requested: usize) -> usize {
    requested.clamp(1, MAX_LEADERBOARD_LIMIT)
}

/// A stored leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Row identifier assigned by the store.
    pub id: i64,
    /// Display name, already sanitized.
    pub player_name: String,
    /// Accepted final score.
    pub score: u32,
    /// Number of words in the accepted transcript.
    pub words_count: u32,
    /// Longest chain reached during the game.
    pub longest_chain: u32,
    /// Fixed game length for this entry.
    pub game_duration_seconds: u32,
    /// Game language.
    pub language: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Input for a leaderboard insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Raw player display name; sanitized on insert.
    pub player_name: String,
    /// Accepted final score.
    pub score: u32,
    /// Number of words in the accepted transcript.
    pub words_count: u32,
    /// Longest chain reached during the game.
    pub longest_chain: u32,
    /// Fixed game length.
    pub game_duration_seconds: u32,
    /// Game language.
    pub language: String,
}

impl NewEntry {
    /// Display name trimmed and truncated to [`MAX_PLAYER_NAME_CHARS`]
    /// characters. Truncation counts characters so multi-byte names are
    /// never split mid-character.
    #[must_use]
    pub fn sanitized_name(&self) -> String {
        self.player_name
            .trim()
            .chars()
            .take(MAX_PLAYER_NAME_CHARS)
            .collect()
    }
}

/// Storage errors surfaced by [`LeaderboardStore`] implementations.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The storage backend failed; message is backend-specific.
    #[error("leaderboard backend error: {0}")]
    Backend(String),
}

/// Persistence interface for the leaderboard.
pub trait LeaderboardStore: Send + Sync {
    /// Inserts one write-once entry.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn insert(&self, entry: &NewEntry) -> Result<(), LeaderboardError>;

    /// Returns up to `limit` entries for `language`, ordered by score
    /// descending. Callers should clamp `limit` with [`clamp_limit`];
    /// implementations may clamp again defensively.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn top_n(&self, limit: usize, language: &str) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

/// In-memory [`LeaderboardStore`] for tests and single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    entries: std::sync::RwLock<Vec<LeaderboardEntry>>,
}

impl InMemoryLeaderboard {
    /// Creates an empty leaderboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entries across all languages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LeaderboardStore for InMemoryLeaderboard {
    fn insert(&self, entry: &NewEntry) -> Result<(), LeaderboardError> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1;
        entries.push(LeaderboardEntry {
            id,
            player_name: entry.sanitized_name(),
            score: entry.score,
            words_count: entry.words_count,
            longest_chain: entry.longest_chain,
            game_duration_seconds: entry.game_duration_seconds,
            language: entry.language.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn top_n(
        &self,
        limit: usize,
        language: &str,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matching: Vec<LeaderboardEntry> = entries
            .iter()
            .filter(|e| e.language == language)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.score.cmp(&a.score));
        matching.truncate(clamp_limit(limit));
        Ok(matching)
    }
}
