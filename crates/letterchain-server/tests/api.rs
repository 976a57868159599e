//! End-to-end handler tests over in-memory stores.
//!
//! Handlers are invoked directly with constructed extractors; the full
//! submit pipeline (rate limit, IP heuristics, field validation, chain
//! validation, score check, gate, leaderboard insert) runs exactly as it
//! does behind the router.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{TimeDelta, Utc};
use letterchain_core::iptrack::NoopActivityLog;
use letterchain_core::leaderboard::InMemoryLeaderboard;
use letterchain_core::session::InMemorySessionStore;
use letterchain_core::WordSet;
use letterchain_server::handlers::{leaderboard, start_game, submit_score, LeaderboardQuery};
use letterchain_server::{ApiError, AppState, ServerConfig};
use serde_json::{json, Value};

fn token() -> String {
    "a".repeat(64)
}

/// State with the two-letter continuation rule, so the casa -> saber
/// chain from the scoring fixtures is valid.
fn test_state() -> AppState {
    let config = ServerConfig::from_toml(
        "[game]\n\
         continuation_length = 2\n",
    )
    .expect("valid config");
    AppState::new(
        &config,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryLeaderboard::new()),
        Arc::new(WordSet::from_words(["casa", "saber", "rana", "sol"])),
        Arc::new(NoopActivityLog),
    )
}

fn submit_payload(score: u32) -> Value {
    json!({
        "playerName": "ana",
        "score": score,
        "wordsCount": 2,
        "longestChain": 2,
        "sessionToken": token(),
        "words": ["casa", "saber"],
    })
}

async fn start(state: &AppState) {
    start_game(
        State(state.clone()),
        HeaderMap::new(),
        Json(json!({ "sessionToken": token() })),
    )
    .await
    .expect("start succeeds");
}

#[tokio::test]
async fn full_game_round_trip() {
    let state = test_state();
    start(&state).await;

    let response = submit_score(State(state.clone()), HeaderMap::new(), Json(submit_payload(41)))
        .await
        .expect("submit succeeds");
    assert!(response.0.success);
    assert_eq!(response.0.score, 41);

    let board = leaderboard(
        State(state),
        HeaderMap::new(),
        Query(LeaderboardQuery::default()),
    )
    .await
    .expect("leaderboard succeeds");
    assert_eq!(board.0.entries.len(), 1);
    assert_eq!(board.0.entries[0].player_name, "ana");
    assert_eq!(board.0.entries[0].score, 41);
}

#[tokio::test]
async fn duplicate_start_rejected() {
    let state = test_state();
    start(&state).await;

    let err = start_game(
        State(state),
        HeaderMap::new(),
        Json(json!({ "sessionToken": token() })),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::SessionExists));
}

#[tokio::test]
async fn score_within_tolerance_accepted_beyond_rejected() {
    // Recomputed total for casa -> saber is 41; deviation of exactly 50
    // is accepted, 51 is not.
    let state = test_state();
    start(&state).await;
    submit_score(State(state.clone()), HeaderMap::new(), Json(submit_payload(91)))
        .await
        .expect("91 is within tolerance");

    let state = test_state();
    start(&state).await;
    let err = submit_score(State(state), HeaderMap::new(), Json(submit_payload(92)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ScoreMismatch));
}

#[tokio::test]
async fn broken_chain_rejected() {
    let state = test_state();
    start(&state).await;

    let mut payload = submit_payload(27);
    payload["words"] = json!(["casa", "sol"]);
    let err = submit_score(State(state), HeaderMap::new(), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidChain(_)));
}

#[tokio::test]
async fn word_count_mismatch_rejected() {
    let state = test_state();
    start(&state).await;

    let mut payload = submit_payload(41);
    payload["wordsCount"] = json!(3);
    let err = submit_score(State(state), HeaderMap::new(), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::WordCountMismatch));
}

#[tokio::test]
async fn replayed_submission_rejected() {
    let state = test_state();
    start(&state).await;

    submit_score(State(state.clone()), HeaderMap::new(), Json(submit_payload(41)))
        .await
        .expect("first submit succeeds");
    let err = submit_score(State(state), HeaderMap::new(), Json(submit_payload(41)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionAlreadyUsed));
}

#[tokio::test]
async fn expired_session_rejected() {
    let state = test_state();
    // Session started well past the 60s + 10s cap.
    state
        .sessions
        .create(&token(), "es", Utc::now() - TimeDelta::seconds(100))
        .expect("create succeeds");

    let err = submit_score(State(state), HeaderMap::new(), Json(submit_payload(41)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
}

#[tokio::test]
async fn unknown_session_admitted_per_leniency() {
    let state = test_state();
    // No start call: the token was never registered.
    let response = submit_score(State(state.clone()), HeaderMap::new(), Json(submit_payload(41)))
        .await
        .expect("unknown session is admitted");
    assert!(response.0.success);

    let board = leaderboard(
        State(state),
        HeaderMap::new(),
        Query(LeaderboardQuery::default()),
    )
    .await
    .unwrap();
    assert_eq!(board.0.entries.len(), 1);
}

#[tokio::test]
async fn invalid_payload_rejected_before_game_logic() {
    let state = test_state();
    let mut payload = submit_payload(41);
    payload["playerName"] = json!("<script>alert(1)</script>");
    let err = submit_score(State(state), HeaderMap::new(), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

#[tokio::test]
async fn concurrent_submissions_insert_exactly_one_row() {
    let state = test_state();
    start(&state).await;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                submit_score(State(state), HeaderMap::new(), Json(submit_payload(41))).await
            })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await.expect("task completes") {
            Ok(_) => accepted += 1,
            Err(ApiError::SessionAlreadyUsed) => {},
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(accepted, 1, "exactly one submission may win");

    let board = leaderboard(
        State(state),
        HeaderMap::new(),
        Query(LeaderboardQuery::default()),
    )
    .await
    .unwrap();
    assert_eq!(board.0.entries.len(), 1);
}

#[tokio::test]
async fn rate_limit_enforced_per_client() {
    let config = ServerConfig::from_toml(
        "[rate_limit]\n\
         max_requests = 2\n",
    )
    .expect("valid config");
    let state = AppState::new(
        &config,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryLeaderboard::new()),
        Arc::new(WordSet::from_words(["casa"])),
        Arc::new(NoopActivityLog),
    );

    let query = || Query(LeaderboardQuery::default());
    leaderboard(State(state.clone()), HeaderMap::new(), query())
        .await
        .expect("first request allowed");
    leaderboard(State(state.clone()), HeaderMap::new(), query())
        .await
        .expect("second request allowed");
    let err = leaderboard(State(state), HeaderMap::new(), query())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::RateLimited { .. }));
}

#[tokio::test]
async fn leaderboard_orders_by_score_and_honors_limit() {
    let state = test_state();
    for (name, score) in [("uno", 100), ("dos", 300), ("tres", 200)] {
        state
            .leaderboard
            .insert(&letterchain_core::NewEntry {
                player_name: name.to_string(),
                score,
                words_count: 2,
                longest_chain: 2,
                game_duration_seconds: 60,
                language: "es".to_string(),
            })
            .unwrap();
    }

    let board = leaderboard(
        State(state),
        HeaderMap::new(),
        Query(LeaderboardQuery {
            limit: Some(2),
            language: None,
        }),
    )
    .await
    .unwrap();
    let scores: Vec<u32> = board.0.entries.iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![300, 200]);
}
