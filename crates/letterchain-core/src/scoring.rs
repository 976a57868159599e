//! Score calculator.
//!
//! Scoring is deterministic so the server can recompute a submitted
//! transcript's total and compare it against the client's claim. Per-word
//! points are:
//!
//! - base: 10
//! - length bonus: 2 per character over 3
//! - chain bonus: 5 per position in the chain (1-indexed)
//!
//! The client additionally applies a response-speed combo multiplier and a
//! time bonus. Neither is recomputable server-side (the server never sees
//! per-word timing), which is why score verification uses a tolerance band
//! instead of exact equality. A client can therefore claim the maximum
//! multiplier within the tolerance; this is a known validation gap in the
//! game design, kept rather than silently changed.

use thiserror::Error;

/// Points every accepted word earns regardless of length or position.
pub const BASE_POINTS: u32 = 10;

/// Character count above which the length bonus starts.
pub const LENGTH_BONUS_THRESHOLD: usize = 3;

/// Points per character over [`LENGTH_BONUS_THRESHOLD`].
pub const LENGTH_BONUS_PER_CHAR: u32 = 2;

/// Points per chain position (1-indexed).
pub const CHAIN_BONUS_STEP: u32 = 5;

/// Allowed absolute deviation between the submitted total and the
/// recomputed total. Inclusive: a deviation of exactly this value passes.
pub const SCORE_TOLERANCE: u32 = 50;

/// Absolute sanity ceiling for a 60-second game.
pub const MAX_REASONABLE_SCORE: u32 = 10_000;

/// Why a submitted score was rejected.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// Submitted total deviates from the recomputed total beyond tolerance.
    #[error("submitted score {submitted} deviates from expected {expected} beyond tolerance")]
    Mismatch {
        /// Score the client claimed.
        submitted: u32,
        /// Score recomputed from the transcript.
        expected: u32,
    },

    /// Submitted total exceeds the absolute ceiling.
    #[error("submitted score {submitted} exceeds ceiling {ceiling}")]
    TooHigh {
        /// Score the client claimed.
        submitted: u32,
        /// The [`MAX_REASONABLE_SCORE`] ceiling.
        ceiling: u32,
    },
}

/// Score for one word at the given 1-indexed chain position.
///
/// Word length is measured in characters, not bytes.
#[must_use]
pub fn word_score(word: &str, position: u32) -> u32 {
    let len = word.chars().count();
    let length_bonus =
        u32::try_from(len.saturating_sub(LENGTH_BONUS_THRESHOLD)).unwrap_or(u32::MAX)
            * LENGTH_BONUS_PER_CHAR;
    BASE_POINTS + length_bonus + position * CHAIN_BONUS_STEP
}

/// Recomputed total for a full transcript.
pub fn chain_score<S: AsRef<str>>(words: &[S]) -> u32 {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let position = u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1);
            word_score(w.as_ref(), position)
        })
        .sum()
}

/// A response-speed multiplier with its display label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboMultiplier {
    /// Factor applied to that word's score.
    pub multiplier: f64,
    /// Label shown next to the score popup ("x3", "x1.5", ...).
    pub label: &'static str,
}

/// Step function mapping time-to-answer to a combo multiplier.
///
/// Applied client-side to the word just accepted; answers slower than five
/// seconds earn no multiplier. The server does not re-verify this.
#[must_use]
pub const fn combo_multiplier(elapsed_ms: u64) -> Option<ComboMultiplier> {
    match elapsed_ms {
        0..=999 => Some(ComboMultiplier {
            multiplier: 3.0,
            label: "x3",
        }),
        1000..=1999 => Some(ComboMultiplier {
            multiplier: 2.0,
            label: "x2",
        }),
        2000..=2999 => Some(ComboMultiplier {
            multiplier: 1.5,
            label: "x1.5",
        }),
        3000..=3999 => Some(ComboMultiplier {
            multiplier: 1.25,
            label: "x1.25",
        }),
        4000..=4999 => Some(ComboMultiplier {
            multiplier: 1.1,
            label: "x1.1",
        }),
        _ => None,
    }
}

/// Bonus for finishing words while more than half the game clock remains.
///
/// One point per ten seconds of the first-half surplus, zero once the game
/// is past its halfway mark.
#[must_use]
pub const fn time_bonus(time_remaining: u32, total_time: u32) -> u32 {
    let half = total_time / 2;
    if time_remaining > half {
        (time_remaining - half) / 10
    } else {
        0
    }
}

/// Server-side acceptance check for a client-submitted total.
///
/// The tolerance absorbs the client-only combo multiplier and time bonus;
/// the ceiling catches totals no legitimate 60-second game can reach. The
/// tolerance check runs first so an absurd-but-close claim still reports
/// the more specific reason.
///
/// # Errors
///
/// [`ScoreError::Mismatch`] when the deviation exceeds [`SCORE_TOLERANCE`]
/// (strictly; a deviation of exactly the tolerance is accepted), and
/// [`ScoreError::TooHigh`] when the claim exceeds [`MAX_REASONABLE_SCORE`].
pub fn verify_submitted_score(submitted: u32, recomputed: u32) -> Result<(), ScoreError> {
    if submitted.abs_diff(recomputed) > SCORE_TOLERANCE {
        return Err(ScoreError::Mismatch {
            submitted,
            expected: recomputed,
        });
    }

    if submitted > MAX_REASONABLE_SCORE {
        return Err(ScoreError::TooHigh {
            submitted,
            ceiling: MAX_REASONABLE_SCORE,
        });
    }

    Ok(())
}
