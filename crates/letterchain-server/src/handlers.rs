//! HTTP handlers and the router.
//!
//! The submission pipeline rejects at the first failed stage with a
//! specific reason, in this order: rate limit, IP heuristics, declarative
//! field validation, word-count cross-check, chain validation, score
//! recomputation and tolerance check, submission gate, leaderboard insert.
//! No partial credit: nothing is persisted unless every stage passes.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use letterchain_core::leaderboard::{DEFAULT_LEADERBOARD_LIMIT, LeaderboardEntry, NewEntry};
use letterchain_core::request::{start_payload_rules, submit_payload_rules, validate_payload};
use letterchain_core::session::GateOutcome;
use letterchain_core::{chain_score, validate_chain, verify_submitted_score};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client_ip::{client_ip, user_agent};
use crate::error::ApiError;
use crate::state::AppState;

/// Builds the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/game/start", post(start_game))
        .route("/api/game/submit", post(submit_score))
        .route("/api/leaderboard", get(leaderboard))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub session_token: String,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    pub session_token: String,
    pub started_at: DateTime<Utc>,
}

/// `POST /api/game/start` — registers a new game session.
pub async fn start_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<StartResponse>, ApiError> {
    let ip = client_ip(&headers);
    admit_client(&state, &headers, &ip)?;

    check_fields(&state, &headers, &ip, &start_payload_rules(), &payload)?;
    let request: StartRequest = serde_json::from_value(payload)
        .map_err(|e| ApiError::InvalidRequest(format!("malformed payload: {e}")))?;

    let language = request
        .language
        .unwrap_or_else(|| state.default_language.clone());
    let started_at = Utc::now();
    state
        .sessions
        .create(&request.session_token, &language, started_at)?;

    info!(session_token = %request.session_token, %language, "game session started");
    Ok(Json(StartResponse {
        success: true,
        session_token: request.session_token,
        started_at,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub player_name: String,
    pub score: u32,
    pub words_count: u32,
    pub longest_chain: u32,
    pub session_token: String,
    pub words: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub score: u32,
}

/// `POST /api/game/submit` — validates and records one scored game.
pub async fn submit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let ip = client_ip(&headers);
    admit_client(&state, &headers, &ip)?;

    check_fields(&state, &headers, &ip, &submit_payload_rules(), &payload)?;
    let request: SubmitRequest = serde_json::from_value(payload)
        .map_err(|e| ApiError::InvalidRequest(format!("malformed payload: {e}")))?;

    if request.words.len() != request.words_count as usize {
        return Err(ApiError::WordCountMismatch);
    }

    validate_chain(&request.words, state.continuation, state.dictionary.as_ref())?;

    let recomputed = chain_score(&request.words);
    if let Err(err) = verify_submitted_score(request.score, recomputed) {
        warn!(
            submitted = request.score,
            recomputed,
            %ip,
            "score rejected: {err}"
        );
        state.activity_log.record(
            &ip,
            &user_agent(&headers),
            "score validation failed",
            json!({ "submitted": request.score, "recomputed": recomputed }),
        );
        return Err(err.into());
    }

    let outcome = state.gate.admit(
        state.sessions.as_ref(),
        &request.session_token,
        Utc::now(),
        &request.words,
        request.score,
    )?;
    if outcome == GateOutcome::UnknownSession {
        state.activity_log.record(
            &ip,
            &user_agent(&headers),
            "submission for unknown session",
            json!({ "sessionToken": request.session_token }),
        );
    }

    let language = request
        .language
        .unwrap_or_else(|| state.default_language.clone());
    state.leaderboard.insert(&NewEntry {
        player_name: request.player_name.clone(),
        score: request.score,
        words_count: request.words_count,
        longest_chain: request.longest_chain,
        game_duration_seconds: state.game_duration_seconds,
        language,
    })?;

    info!(
        player = %request.player_name,
        score = request.score,
        words = request.words_count,
        "submission accepted"
    );
    Ok(Json(SubmitResponse {
        success: true,
        score: request.score,
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct LeaderboardQuery {
    /// Page size; defaults to 10, capped at 100.
    pub limit: Option<usize>,
    /// Language filter; defaults to the configured language.
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub player_name: String,
    pub score: u32,
    pub words_count: u32,
    pub longest_chain: u32,
    pub game_duration_seconds: u32,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl From<LeaderboardEntry> for LeaderboardRow {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            player_name: entry.player_name,
            score: entry.score,
            words_count: entry.words_count,
            longest_chain: entry.longest_chain,
            game_duration_seconds: entry.game_duration_seconds,
            language: entry.language,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardRow>,
}

/// `GET /api/leaderboard?limit&language` — top scores, best first.
pub async fn leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let ip = client_ip(&headers);
    admit_client(&state, &headers, &ip)?;

    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let language = query
        .language
        .unwrap_or_else(|| state.default_language.clone());
    let entries = state.leaderboard.top_n(limit, &language)?;

    Ok(Json(LeaderboardResponse {
        entries: entries.into_iter().map(LeaderboardRow::from).collect(),
    }))
}

/// Rate limit and IP heuristics, shared by every endpoint. Denials from
/// the heuristics are recorded in the suspicious-activity log.
fn admit_client(state: &AppState, headers: &HeaderMap, ip: &str) -> Result<(), ApiError> {
    if let Err(limited) = state.rate_limiter.check(ip) {
        return Err(ApiError::RateLimited {
            retry_after: limited.retry_after,
            limit: limited.limit,
        });
    }

    if let Err(rejection) = state.ip_tracker.check(ip) {
        state.activity_log.record(
            ip,
            &user_agent(headers),
            &rejection.to_string(),
            Value::Null,
        );
        return Err(rejection.into());
    }

    Ok(())
}

/// Declarative payload validation; probing-shaped violations are recorded.
fn check_fields(
    state: &AppState,
    headers: &HeaderMap,
    ip: &str,
    rules: &[(&str, letterchain_core::request::FieldRule)],
    payload: &Value,
) -> Result<(), ApiError> {
    let report = validate_payload(rules, payload);
    if report.is_valid() {
        return Ok(());
    }
    if report.should_track {
        state.activity_log.record(
            ip,
            &user_agent(headers),
            "request validation failed",
            json!({ "errors": report.errors }),
        );
    }
    Err(ApiError::InvalidRequest(report.errors.join("; ")))
}
