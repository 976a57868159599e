//! Session and submission gate.
//!
//! A session correlates a client-generated opaque token with a
//! server-observed start time. Its lifecycle is `CREATED -> VALIDATED`,
//! terminal: one scored submission per session, ever. The gate enforces
//! that plus a wall-clock duration cap (game length plus a network-latency
//! buffer).
//!
//! The "did this call win?" decision is delegated to the store's
//! conditional update: `mark_validated` flips the flag only when it is not
//! already set and reports whether this call flipped it. Two submissions
//! racing through the pre-checks therefore still resolve to exactly one
//! winner; the loser is told the session was already used.
//!
//! One deliberate leniency: a submission whose session token was never
//! created (e.g. the start request was lost to a network error) is admitted
//! anyway, with a warning logged. A fresh session may always be started, so
//! every gate rejection is recoverable by the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// A game session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    /// Client-generated opaque high-entropy token.
    pub session_token: String,
    /// Game language for this session.
    pub language: String,
    /// Server-observed creation time.
    pub started_at: DateTime<Utc>,
    /// When the scored submission arrived; `None` while `CREATED`.
    pub ended_at: Option<DateTime<Utc>>,
    /// Accepted transcript; empty while `CREATED`.
    pub words_played: Vec<String>,
    /// Terminal flag: a validated session rejects further submissions.
    pub is_validated: bool,
    /// Accepted score; `None` while `CREATED`.
    pub final_score: Option<u32>,
}

/// Storage errors surfaced by [`SessionStore`] implementations.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// A session with this token already exists.
    #[error("session token already exists")]
    DuplicateToken,

    /// The storage backend failed; message is backend-specific.
    #[error("session store backend error: {0}")]
    Backend(String),
}

/// Persistence interface for game sessions.
///
/// Implementations must make `mark_validated` atomic with respect to
/// concurrent callers: the returned boolean is the single source of truth
/// for whether this call transitioned the session to `VALIDATED`.
pub trait SessionStore: Send + Sync {
    /// Records a new session in the `CREATED` state.
    ///
    /// # Errors
    ///
    /// [`SessionStoreError::DuplicateToken`] if the token is already known.
    fn create(
        &self,
        token: &str,
        language: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError>;

    /// Looks up a session by token.
    ///
    /// # Errors
    ///
    /// Backend failures only; an unknown token is `Ok(None)`.
    fn get(&self, token: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Conditionally transitions the session to `VALIDATED`, recording the
    /// end time, transcript, and accepted score.
    ///
    /// Returns `true` only if this call performed the transition (the
    /// session existed and was not yet validated). Compare-and-set
    /// semantics: under concurrent calls for one token, exactly one caller
    /// sees `true`.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn mark_validated(
        &self,
        token: &str,
        ended_at: DateTime<Utc>,
        words: &[String],
        score: u32,
    ) -> Result<bool, SessionStoreError>;
}

/// Timing parameters for the submission gate.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Fixed game length.
    pub game_duration: Duration,
    /// Extra wall-clock slack for network latency before a submission is
    /// considered expired.
    pub submission_buffer: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            game_duration: Duration::from_secs(60),
            submission_buffer: Duration::from_secs(10),
        }
    }
}

/// How an admitted submission was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The session existed and this call won the validation transition.
    Validated,
    /// No session record for the token; admitted under the documented
    /// leniency (lost-session edge case), logged as a warning.
    UnknownSession,
}

/// Why a submission was refused.
#[derive(Debug, Error)]
pub enum GateError {
    /// The session has already accepted a scored submission.
    #[error("session already used")]
    AlreadyUsed,

    /// The submission arrived after the game duration plus buffer.
    #[error("session expired ({elapsed_secs}s since start)")]
    Expired {
        /// Wall-clock seconds between session start and this submission.
        elapsed_secs: i64,
    },

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Enforces at-most-once-scored semantics and the duration cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionGate {
    config: GateConfig,
}

impl SubmissionGate {
    /// Creates a gate with the given timing parameters.
    #[must_use]
    pub const fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Admits or refuses one scored submission for `token` at time `now`.
    ///
    /// On success the session (if it exists) is atomically transitioned to
    /// `VALIDATED` with the given transcript and score.
    ///
    /// # Errors
    ///
    /// [`GateError::AlreadyUsed`] for a validated session (including losing
    /// the validation race), [`GateError::Expired`] past the duration cap,
    /// and [`GateError::Store`] for backend failures.
    pub fn admit(
        &self,
        store: &dyn SessionStore,
        token: &str,
        now: DateTime<Utc>,
        words: &[String],
        score: u32,
    ) -> Result<GateOutcome, GateError> {
        let Some(session) = store.get(token)? else {
            // The start request may have been lost before it reached us.
            // Deliberate leniency: accept, but leave a trace.
            warn!(session_token = %token, "submission for unknown session token, allowing");
            return Ok(GateOutcome::UnknownSession);
        };

        if session.is_validated {
            return Err(GateError::AlreadyUsed);
        }

        let elapsed = now.signed_duration_since(session.started_at);
        let max_elapsed = self.config.game_duration + self.config.submission_buffer;
        if elapsed.num_milliseconds() > i64::try_from(max_elapsed.as_millis()).unwrap_or(i64::MAX)
        {
            return Err(GateError::Expired {
                elapsed_secs: elapsed.num_seconds(),
            });
        }

        // The conditional update decides the race, not the check above.
        if store.mark_validated(token, now, words, score)? {
            Ok(GateOutcome::Validated)
        } else {
            Err(GateError::AlreadyUsed)
        }
    }
}

/// In-memory [`SessionStore`] for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: std::sync::RwLock<std::collections::HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &self,
        token: &str,
        language: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if sessions.contains_key(token) {
            return Err(SessionStoreError::DuplicateToken);
        }
        sessions.insert(
            token.to_string(),
            SessionRecord {
                session_token: token.to_string(),
                language: language.to_string(),
                started_at,
                ended_at: None,
                words_played: Vec::new(),
                is_validated: false,
                final_score: None,
            },
        );
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(sessions.get(token).cloned())
    }

    fn mark_validated(
        &self,
        token: &str,
        ended_at: DateTime<Utc>,
        words: &[String],
        score: u32,
    ) -> Result<bool, SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match sessions.get_mut(token) {
            Some(session) if !session.is_validated => {
                session.is_validated = true;
                session.ended_at = Some(ended_at);
                session.words_played = words.to_vec();
                session.final_score = Some(score);
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}
