//! Property tests over generated chains.

use letterchain_core::scoring::{chain_score, verify_submitted_score, SCORE_TOLERANCE};
use letterchain_core::{validate_chain, ContinuationLength, WordSet};
use proptest::prelude::*;

/// Builds a chain by walking the continuation rule: each word starts with
/// the trailing character of its predecessor, and a numbered suffix keeps
/// all words distinct. Returns the words plus a dictionary containing
/// exactly them.
fn generated_chain(seed_letters: &[char], stems: &[String]) -> (Vec<String>, WordSet) {
    let mut words = Vec::with_capacity(stems.len());
    let mut prev_last = seed_letters[0];
    for (i, stem) in stems.iter().enumerate() {
        let word = format!("{prev_last}{stem}{i}");
        prev_last = word.chars().last().unwrap_or('a');
        words.push(word);
    }
    let dict = WordSet::from_words(&words);
    (words, dict)
}

proptest! {
    #[test]
    fn walked_chains_always_validate(
        first in proptest::char::range('a', 'z'),
        stems in proptest::collection::vec("[a-z]{1,8}", 1..20),
    ) {
        let (words, dict) = generated_chain(&[first], &stems);
        prop_assert_eq!(
            validate_chain(&words, ContinuationLength::One, &dict),
            Ok(())
        );
    }

    #[test]
    fn recomputed_total_is_self_consistent(
        stems in proptest::collection::vec("[a-z]{1,8}", 1..20),
    ) {
        let (words, _dict) = generated_chain(&['a'], &stems);
        let total = chain_score(&words);
        // A total within the ceiling must pass verification against itself.
        if total <= 10_000 {
            prop_assert!(verify_submitted_score(total, total).is_ok());
        }
    }

    #[test]
    fn tolerance_boundary_is_inclusive(
        total in 0u32..9_000,
        deviation in 0u32..=SCORE_TOLERANCE,
    ) {
        prop_assert!(verify_submitted_score(total + deviation, total).is_ok());
        prop_assert!(verify_submitted_score(total.saturating_sub(deviation), total).is_ok());
    }

    #[test]
    fn beyond_tolerance_always_rejects(
        total in 0u32..9_000,
        excess in 1u32..1_000,
    ) {
        prop_assert!(
            verify_submitted_score(total + SCORE_TOLERANCE + excess, total).is_err()
        );
    }
}
