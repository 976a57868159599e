//! Shared handler state.
//!
//! Everything the handlers touch is injected here: stores behind trait
//! objects, the rate limiter, the IP tracker, the submission gate, and the
//! dictionary. Nothing is a module-level singleton, so tests assemble a
//! state from in-memory parts and multi-instance deployments can swap the
//! backends.

use std::sync::Arc;
use std::time::Duration;

use letterchain_core::chain::ContinuationLength;
use letterchain_core::iptrack::{ActivityLog, IpTracker};
use letterchain_core::ratelimit::{RateLimitConfig, RateLimiter};
use letterchain_core::session::{GateConfig, SessionStore, SubmissionGate};
use letterchain_core::{Dictionary, LeaderboardStore};

use crate::config::ServerConfig;

/// Cloneable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Session persistence.
    pub sessions: Arc<dyn SessionStore>,
    /// Leaderboard persistence.
    pub leaderboard: Arc<dyn LeaderboardStore>,
    /// Word membership oracle.
    pub dictionary: Arc<dyn Dictionary>,
    /// Per-client request budget.
    pub rate_limiter: Arc<RateLimiter>,
    /// Per-IP abuse heuristics.
    pub ip_tracker: Arc<IpTracker>,
    /// Sink for suspicious-activity records.
    pub activity_log: Arc<dyn ActivityLog>,
    /// At-most-once-scored submission gate.
    pub gate: SubmissionGate,
    /// Trailing characters the next word must continue.
    pub continuation: ContinuationLength,
    /// Language assumed when a request does not name one.
    pub default_language: String,
    /// Fixed game length in seconds, recorded on leaderboard rows.
    pub game_duration_seconds: u32,
}

impl AppState {
    /// Assembles state from configuration and the injected collaborators.
    #[must_use]
    pub fn new(
        config: &ServerConfig,
        sessions: Arc<dyn SessionStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        dictionary: Arc<dyn Dictionary>,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        let gate = SubmissionGate::new(GateConfig {
            game_duration: Duration::from_secs(u64::from(config.game.duration_seconds)),
            submission_buffer: Duration::from_secs(u64::from(
                config.game.submission_buffer_seconds,
            )),
        });
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit.max_requests,
            window: Duration::from_secs(config.rate_limit.window_seconds),
            ..RateLimitConfig::default()
        }));

        Self {
            sessions,
            leaderboard,
            dictionary,
            rate_limiter,
            ip_tracker: Arc::new(IpTracker::default()),
            activity_log,
            gate,
            continuation: config.game.continuation(),
            default_language: config.default_language.clone(),
            game_duration_seconds: config.game.duration_seconds,
        }
    }
}
