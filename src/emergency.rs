//! Emergency screening. Runs on the normalized text before any storage or
//! AI call; a hit short-circuits the whole pipeline.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::normalize::canonicalize;

/// Ordered phrase list, first hit wins. Embedded so the safety screen can
/// never be lost to a missing data file. Entries are canonicalized at load
/// with the same transform as queries, so punctuated entries still match.
static EMERGENCY_PHRASES: Lazy<Vec<String>> = Lazy::new(|| {
    let raw: Vec<String> =
        serde_json::from_str(include_str!("../emergency_phrases.json")).expect("valid phrase list");
    raw.iter().map(|p| canonicalize(p)).collect()
});

const MESSAGE: &str = "Seek Immediate Medical Attention";
const ACTION: &str = "Visit the nearest hospital or call emergency services immediately. \
     This symptom requires urgent professional medical care.";
const DISCLAIMER: &str = "This is an automated alert. Always prioritize professional medical \
     evaluation for serious symptoms.";

/// Alert returned instead of a remedy when an emergency phrase is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencySignal {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub action: String,
    pub detected_keyword: String,
    pub disclaimer: String,
}

impl EmergencySignal {
    fn for_phrase(phrase: &str) -> Self {
        Self {
            kind: "emergency".to_string(),
            severity: "critical".to_string(),
            message: MESSAGE.to_string(),
            action: ACTION.to_string(),
            detected_keyword: phrase.to_string(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// Scan normalized text for emergency phrases. First phrase in list order
/// wins and is reported as `detected_keyword`.
pub fn detect_emergency(normalized: &str) -> Option<EmergencySignal> {
    let hay = normalized.to_lowercase();
    EMERGENCY_PHRASES
        .iter()
        .find(|phrase| hay.contains(phrase.as_str()))
        .map(|phrase| EmergencySignal::for_phrase(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_symptom;

    #[test]
    fn detects_phrase_inside_longer_text() {
        let q = normalize_symptom("I am having CHEST PAIN since morning");
        let sig = detect_emergency(&q.normalized).expect("emergency");
        assert_eq!(sig.detected_keyword, "chest pain");
        assert_eq!(sig.kind, "emergency");
        assert_eq!(sig.severity, "critical");
        assert_eq!(sig.message, "Seek Immediate Medical Attention");
    }

    #[test]
    fn first_phrase_in_list_order_wins() {
        // Both "fainting" and "seizure" appear; "fainting" is listed first.
        let q = normalize_symptom("seizure then fainting");
        let sig = detect_emergency(&q.normalized).expect("emergency");
        assert_eq!(sig.detected_keyword, "fainting");
    }

    #[test]
    fn punctuated_list_entries_match_normalized_input() {
        // The list ships "can't breathe"; normalization turns both sides
        // into "can t breathe".
        let q = normalize_symptom("help, I can't breathe");
        let sig = detect_emergency(&q.normalized).expect("emergency");
        assert_eq!(sig.detected_keyword, "can t breathe");
    }

    #[test]
    fn benign_symptoms_pass() {
        let q = normalize_symptom("mild cough and runny nose");
        assert!(detect_emergency(&q.normalized).is_none());
    }

    #[test]
    fn phrase_list_is_nonempty_and_canonical() {
        assert!(!EMERGENCY_PHRASES.is_empty());
        for p in EMERGENCY_PHRASES.iter() {
            assert_eq!(p, &canonicalize(p));
        }
    }
}
