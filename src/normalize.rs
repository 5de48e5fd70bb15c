//! Input normalization. Everything downstream (emergency screen, matching,
//! prompts) works from this canonical form, never from raw input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tokens too common to carry matching signal.
const STOP_WORDS: [&str; 11] = [
    "the", "and", "have", "with", "for", "from", "that", "this", "are", "was", "been",
];

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// A symptom description in canonical form.
///
/// `keywords` keeps duplicates and first-occurrence order; scoring is
/// required to be invariant to the duplicates, so they are not stripped here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomQuery {
    pub original: String,
    pub normalized: String,
    pub keywords: Vec<String>,
}

/// Canonical text transform: lowercase, punctuation to spaces, collapsed
/// whitespace. Shared with the emergency phrase list so both sides agree.
pub fn canonicalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a raw symptom description. Pure and total: empty or
/// whitespace-only input yields empty `normalized` and `keywords`.
pub fn normalize_symptom(raw: &str) -> SymptomQuery {
    let original = raw.trim().to_string();
    let normalized = canonicalize(raw);
    let keywords = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect();
    SymptomQuery {
        original,
        normalized,
        keywords,
    }
}
