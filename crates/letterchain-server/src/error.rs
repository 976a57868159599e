//! API error types and their HTTP mapping.
//!
//! Every rejection maps to a specific reason code and status so the client
//! can distinguish a rule violation from an anti-cheat rejection. Response
//! bodies are `{"error": "..."}` JSON and never expose backend detail; the
//! full error is logged server-side instead.

use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use letterchain_core::chain::ChainError;
use letterchain_core::iptrack::IpRejection;
use letterchain_core::leaderboard::LeaderboardError;
use letterchain_core::scoring::ScoreError;
use letterchain_core::session::{GateError, SessionStoreError};
use serde_json::json;
use thiserror::Error;

/// Errors returned by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The payload failed declarative field validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// `wordsCount` does not match the transcript length.
    #[error("word count mismatch")]
    WordCountMismatch,

    /// The transcript violated a chain rule.
    #[error("invalid word chain: {0}")]
    InvalidChain(#[from] ChainError),

    /// Submitted score deviates from the recomputed total beyond tolerance.
    #[error("score validation failed")]
    ScoreMismatch,

    /// Submitted score exceeds the sanity ceiling.
    #[error("score too high")]
    ScoreTooHigh,

    /// The session already accepted a scored submission.
    #[error("session already used")]
    SessionAlreadyUsed,

    /// The submission arrived past the duration cap.
    #[error("session expired")]
    SessionExpired,

    /// A session with this token already exists.
    #[error("session already exists")]
    SessionExists,

    /// The client exhausted its rate-limit window.
    #[error("too many requests")]
    RateLimited {
        /// Time until the window resets.
        retry_after: Duration,
        /// Configured per-window limit.
        limit: u32,
    },

    /// An IP-heuristic denied the request.
    #[error("request blocked: {0}")]
    IpBlocked(#[from] IpRejection),

    /// A storage collaborator failed; detail stays in the logs.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::Mismatch { .. } => Self::ScoreMismatch,
            ScoreError::TooHigh { .. } => Self::ScoreTooHigh,
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::AlreadyUsed => Self::SessionAlreadyUsed,
            GateError::Expired { .. } => Self::SessionExpired,
            GateError::Store(e) => Self::Storage(e.to_string()),
        }
    }
}

impl From<SessionStoreError> for ApiError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::DuplicateToken => Self::SessionExists,
            SessionStoreError::Backend(e) => Self::Storage(e),
        }
    }
}

impl From<LeaderboardError> for ApiError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::Backend(e) => Self::Storage(e),
        }
    }
}

impl ApiError {
    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::WordCountMismatch
            | Self::InvalidChain(_)
            | Self::ScoreMismatch
            | Self::ScoreTooHigh
            | Self::SessionAlreadyUsed
            | Self::SessionExpired
            | Self::SessionExists => StatusCode::BAD_REQUEST,
            Self::IpBlocked(_) => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing reason string. Storage detail is deliberately
    /// replaced with a generic message.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(detail) => detail.clone(),
            Self::WordCountMismatch => "Word count mismatch".to_string(),
            Self::InvalidChain(_) => "Invalid word chain".to_string(),
            Self::ScoreMismatch => "Score validation failed".to_string(),
            Self::ScoreTooHigh => "Score too high".to_string(),
            Self::SessionAlreadyUsed => "Session already used".to_string(),
            Self::SessionExpired => "Session expired".to_string(),
            Self::SessionExists => "Session already exists".to_string(),
            Self::RateLimited { .. } => {
                "Too many requests. Please try again later.".to_string()
            },
            Self::IpBlocked(rejection) => rejection.to_string(),
            Self::Storage(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(detail) = &self {
            tracing::error!(detail = %detail, "storage failure");
        }

        let status = self.status_code();
        let body = Json(json!({ "error": self.public_message() }));
        let mut response = (status, body).into_response();

        if let Self::RateLimited { retry_after, limit } = &self {
            let headers = response.headers_mut();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                headers.insert(RETRY_AFTER, value);
            }
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert(HeaderName::from_static("x-ratelimit-limit"), value);
            }
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from_static("0"),
            );
        }

        response
    }
}
