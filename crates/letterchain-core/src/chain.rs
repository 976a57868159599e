//! Chain validator.
//!
//! A chain is an ordered sequence of words where each word after the first
//! must begin with the trailing letter(s) of its predecessor. The validator
//! checks three things over the case-folded tokens:
//!
//! 1. every token is a member of the dictionary oracle;
//! 2. the continuation rule holds for every adjacent pair;
//! 3. no token is used twice (case-insensitive).
//!
//! Validation is a pure function over the chain plus the read-only
//! dictionary. Rejection reports the first violated rule with enough context
//! for a reason code; there is no partial credit.

use thiserror::Error;

use crate::dictionary::Dictionary;

/// How many trailing characters of the previous word the next word must
/// start with. Which variant applies depends on the configured game mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContinuationLength {
    /// Next word starts with the last letter of the previous word.
    One,
    /// Next word starts with the last two letters of the previous word.
    Two,
}

impl ContinuationLength {
    /// The number of characters carried over.
    #[must_use]
    pub const fn chars(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Why a chain failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The chain holds no words at all.
    #[error("chain is empty")]
    Empty,

    /// A token is not in the dictionary.
    #[error("unknown word '{word}' at position {index}")]
    UnknownWord {
        /// Zero-based position in the chain.
        index: usize,
        /// The offending token, case-folded.
        word: String,
    },

    /// A token does not continue its predecessor.
    #[error("word at position {index} must start with '{expected_prefix}'")]
    BrokenChain {
        /// Zero-based position of the non-continuing token.
        index: usize,
        /// The suffix of the previous word the token had to start with.
        expected_prefix: String,
    },

    /// The same word appears more than once in the chain.
    #[error("word '{word}' used more than once")]
    DuplicateWord {
        /// The repeated token, case-folded.
        word: String,
    },
}

/// Returns the trailing `count` characters of `word`.
///
/// When the word is shorter than `count` the whole word is returned, so a
/// two-letter continuation after a one-letter word degrades to the full
/// word rather than failing.
fn trailing_chars(word: &str, count: usize) -> String {
    let len = word.chars().count();
    word.chars().skip(len.saturating_sub(count)).collect()
}

/// Validates a full chain transcript against the continuation rule, the
/// dictionary, and the no-repeat constraint.
///
/// Tokens are case-folded before any comparison. Comparisons operate on
/// characters, not bytes, so words with `ñ` and accented vowels chain
/// correctly.
///
/// # Errors
///
/// Returns the first [`ChainError`] encountered, scanning front to back;
/// duplicate detection runs after the per-token checks, matching the rule
/// order players see.
pub fn validate_chain(
    words: &[String],
    continuation: ContinuationLength,
    dict: &dyn Dictionary,
) -> Result<(), ChainError> {
    if words.is_empty() {
        return Err(ChainError::Empty);
    }

    let folded: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    for (index, word) in folded.iter().enumerate() {
        if !dict.contains(word) {
            return Err(ChainError::UnknownWord {
                index,
                word: word.clone(),
            });
        }

        if index > 0 {
            let expected_prefix = trailing_chars(&folded[index - 1], continuation.chars());
            if !word.starts_with(&expected_prefix) {
                return Err(ChainError::BrokenChain {
                    index,
                    expected_prefix,
                });
            }
        }
    }

    let mut seen = std::collections::HashSet::with_capacity(folded.len());
    for word in &folded {
        if !seen.insert(word.as_str()) {
            return Err(ChainError::DuplicateWord { word: word.clone() });
        }
    }

    Ok(())
}
