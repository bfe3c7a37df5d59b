//! Guess resolution: normalisation and exact / alias / typo-tolerant matching.
//!
//! Resolution is a pure function of the candidate, the normalised answer keys of the
//! round and the typo-tolerance flag. Candidates and answer keys go through the very
//! same [`normalize`] function.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::state::game::AnswerSet;

/// Maximum edit distance tolerated when typos are allowed.
const MAX_TYPO_DISTANCE: usize = 1;
/// Candidates shorter than this never match through typo tolerance.
const MIN_TYPO_LENGTH: usize = 4;

/// Result of comparing a candidate against the accepted answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessMatch {
    /// The normalised candidate equals one of the answer keys.
    Exact,
    /// The candidate is within the tolerated edit distance of an answer key.
    Typo,
    /// No answer key matched.
    Miss,
}

impl GuessMatch {
    /// Whether the guess counts as correct.
    pub fn is_correct(self) -> bool {
        !matches!(self, GuessMatch::Miss)
    }
}

/// Normalise free text for comparison: lowercase, strip diacritics and punctuation,
/// spell out `&` and collapse whitespace. Idempotent.
pub fn normalize(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut cleaned = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c == '&' {
            cleaned.push_str(" and ");
        } else if c.is_alphanumeric() || c.is_whitespace() {
            cleaned.push(c);
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalised, de-duplicated answer keys for an answer set (primary name first).
pub fn answer_keys(answers: &AnswerSet) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(answers.aliases.len() + 1);
    for raw in std::iter::once(&answers.primary_name).chain(answers.aliases.iter()) {
        let key = normalize(raw);
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Decide whether `candidate` matches one of the normalised `answer_keys`.
pub fn resolve(candidate: &str, answer_keys: &[String], typos_allowed: bool) -> GuessMatch {
    let guess = normalize(candidate);
    if guess.is_empty() {
        return GuessMatch::Miss;
    }

    if answer_keys.iter().any(|key| *key == guess) {
        return GuessMatch::Exact;
    }

    if typos_allowed
        && guess.chars().count() >= MIN_TYPO_LENGTH
        && answer_keys
            .iter()
            .any(|key| levenshtein(&guess, key) <= MAX_TYPO_DISTANCE)
    {
        return GuessMatch::Typo;
    }

    GuessMatch::Miss
}

/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
