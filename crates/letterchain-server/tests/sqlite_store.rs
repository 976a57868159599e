//! SQLite store tests against a real database file.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use letterchain_core::session::{GateError, GateOutcome, SessionStore, SubmissionGate};
use letterchain_server::store::{open_database, SqliteSessionStore};

#[test]
fn schema_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("game.db");

    {
        let conn = open_database(&path).expect("first open");
        let store = SqliteSessionStore::new(conn);
        store.create("tok", "es", Utc::now()).expect("create");
    }

    // Reopening applies the schema idempotently and sees the row.
    let conn = open_database(&path).expect("second open");
    let store = SqliteSessionStore::new(conn);
    let session = store.get("tok").expect("get").expect("row persisted");
    assert_eq!(session.language, "es");
    assert!(!session.is_validated);
}

#[test]
fn concurrent_gate_admissions_have_one_winner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let conn = open_database(&dir.path().join("race.db")).expect("open");
    let store = Arc::new(SqliteSessionStore::new(conn));
    let gate = SubmissionGate::default();

    let started = Utc::now();
    store.create("tok", "es", started).expect("create");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                gate.admit(
                    &*store,
                    "tok",
                    started + TimeDelta::seconds(10),
                    &["casa".to_string(), "saber".to_string()],
                    41,
                )
            })
        })
        .collect();

    let mut wins = 0;
    let mut already_used = 0;
    for handle in handles {
        match handle.join().expect("thread completes") {
            Ok(GateOutcome::Validated) => wins += 1,
            Err(GateError::AlreadyUsed) => already_used += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(wins, 1, "the conditional update admits exactly one");
    assert_eq!(already_used, 7);

    let session = store.get("tok").expect("get").expect("session exists");
    assert!(session.is_validated);
    assert_eq!(session.final_score, Some(41));
}
