//! letterchain-core - Word-chain game rule engine
//!
//! This crate holds the pure rule-checking and scoring core of LetterChain:
//! a timed word-chain game where each word must begin with the trailing
//! letter(s) of the previous word. Everything here is deterministic over its
//! inputs plus injected collaborators; there is no HTTP, no SQL, and no
//! async in this crate.
//!
//! # Modules
//!
//! - [`dictionary`]: word-membership oracle trait and a set-backed
//!   implementation
//! - [`chain`]: the chain validator (continuation rule, dictionary
//!   membership, duplicate detection)
//! - [`scoring`]: deterministic per-word and per-chain scoring, plus the
//!   server-side tolerance check against client-submitted totals
//! - [`session`]: the submission gate providing at-most-once-scored
//!   semantics per game session
//! - [`leaderboard`]: leaderboard entry types and the store trait
//! - [`ratelimit`]: fixed-window per-client rate limiter
//! - [`iptrack`]: per-IP abuse heuristics and the suspicious-activity log
//!   trait
//! - [`request`]: declarative field validation for inbound payloads
//!
//! # Thread safety
//!
//! The stateful collaborators ([`ratelimit::RateLimiter`],
//! [`iptrack::IpTracker`], the in-memory stores) are `Send + Sync` and safe
//! to share across concurrent request handlers. They are plain values meant
//! to be constructed once and injected into handler state, never
//! module-level singletons, so a deployment can swap them for a shared
//! distributed store.

pub mod chain;
pub mod dictionary;
pub mod iptrack;
pub mod leaderboard;
pub mod ratelimit;
pub mod request;
pub mod scoring;
pub mod session;

pub use chain::{validate_chain, ChainError, ContinuationLength};
pub use dictionary::{Dictionary, WordSet};
pub use leaderboard::{LeaderboardEntry, LeaderboardStore, NewEntry};
pub use scoring::{chain_score, verify_submitted_score, word_score, ScoreError};
pub use session::{GateConfig, GateError, GateOutcome, SessionStore, SubmissionGate};
