//! Dictionary membership oracle.
//!
//! The validator and the starting-word picker only need two questions
//! answered: "is this token a legal word" and "give me a random word with a
//! length in this range". The oracle is injected so the word list can come
//! from an embedded file, a database, or a test fixture.

use std::collections::HashSet;

use rand::seq::IteratorRandom;

/// Answers word-membership and random-word queries for one language.
///
/// Implementations must case-fold on their side: callers pass tokens as
/// received and expect lookups to be case-insensitive.
pub trait Dictionary: Send + Sync {
    /// Returns `true` if `word` is a legal word.
    fn contains(&self, word: &str) -> bool;

    /// Returns a uniformly random word whose character count lies in
    /// `min_len..=max_len`, or `None` if the dictionary has no such word.
    fn random_word_in_range(&self, min_len: usize, max_len: usize) -> Option<String>;
}

/// A `HashSet`-backed [`Dictionary`].
///
/// Words are case-folded on load so membership checks are a single hash
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct WordSet {
    words: HashSet<String>,
}

impl WordSet {
    /// Builds a word set from an iterator of words.
    ///
    /// Empty tokens are dropped; everything else is lowercased.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Builds a word set from newline-separated text (one word per line).
    ///
    /// This is the loader for word-list files shipped alongside the server.
    #[must_use]
    pub fn from_newline_separated(text: &str) -> Self {
        Self::from_words(text.lines())
    }

    /// Number of words in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the set holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordSet {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    fn random_word_in_range(&self, min_len: usize, max_len: usize) -> Option<String> {
        let mut rng = rand::thread_rng();
        self.words
            .iter()
            .filter(|w| {
                let len = w.chars().count();
                len >= min_len && len <= max_len
            })
            .choose(&mut rng)
            .cloned()
    }
}
