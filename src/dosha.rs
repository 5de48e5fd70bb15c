//! Dosha personalization: the constitutional profile, the ranked-list boost,
//! and the quiz assessor with its fixed content tables.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::matching::RankedRemedy;

/// Multiplier applied to remedies that balance the user's primary dosha.
pub const DEFAULT_DOSHA_BOOST: f64 = 1.2;

/// The three constitutional types. Serialized capitalized ("Vata"), parsed
/// case-insensitively; quiz answers arrive lowercase, stored profiles
/// capitalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dosha {
    Vata,
    Pitta,
    Kapha,
}

impl Dosha {
    pub const ALL: [Dosha; 3] = [Dosha::Vata, Dosha::Pitta, Dosha::Kapha];

    pub fn label(self) -> &'static str {
        match self {
            Dosha::Vata => "Vata",
            Dosha::Pitta => "Pitta",
            Dosha::Kapha => "Kapha",
        }
    }

    pub fn label_lower(self) -> &'static str {
        match self {
            Dosha::Vata => "vata",
            Dosha::Pitta => "pitta",
            Dosha::Kapha => "kapha",
        }
    }
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dosha {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vata" => Ok(Dosha::Vata),
            "pitta" => Ok(Dosha::Pitta),
            "kapha" => Ok(Dosha::Kapha),
            other => Err(format!("unknown dosha label: {other}")),
        }
    }
}

impl Serialize for Dosha {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Dosha {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Stored constitutional profile for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoshaProfile {
    pub primary: Dosha,
    #[serde(default)]
    pub secondary: Option<Dosha>,
    #[serde(default)]
    pub assessment_date: Option<String>,
}

/// Boost ranked remedies whose dosha descriptor balances the user's primary
/// dosha, then stable re-sort by score. The descriptor is free text; the
/// bare-label substring test subsumes the "balances {label}" phrasing.
pub fn adjust_by_dosha(profile: &DoshaProfile, ranked: &mut [RankedRemedy], boost: f64) {
    let primary = profile.primary.label_lower();
    for entry in ranked.iter_mut() {
        let descriptor = entry.remedy.dosha.to_lowercase();
        if descriptor.contains(primary) {
            entry.match_score *= boost;
            entry.dosha_adjusted = true;
        }
    }
    ranked.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// One quiz answer: which dosha the chosen option maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_id: u32,
    pub answer: Dosha,
}

/// Quiz outcome returned to the client and distilled into the stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoshaAssessment {
    pub primary: Dosha,
    pub secondary: Option<Dosha>,
    pub primary_percentage: f64,
    pub secondary_percentage: Option<f64>,
    pub description: String,
    pub recommendations: Vec<String>,
    pub characteristics: Vec<String>,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Tally quiz answers into an assessment. Doshas are ordered by answer count
/// descending with the fixed Vata < Pitta < Kapha order breaking ties, so
/// primary and secondary are deterministic. Empty input yields `None`.
pub fn assess_quiz(answers: &[QuizAnswer]) -> Option<DoshaAssessment> {
    if answers.is_empty() {
        return None;
    }
    let total = answers.len() as f64;
    let mut tally: Vec<(Dosha, usize)> = Dosha::ALL
        .iter()
        .map(|&d| (d, answers.iter().filter(|a| a.answer == d).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let (primary, primary_count) = tally[0];
    let secondary = tally.get(1).copied();

    Some(DoshaAssessment {
        primary,
        secondary: secondary.map(|(d, _)| d),
        primary_percentage: round1(primary_count as f64 / total * 100.0),
        secondary_percentage: secondary.map(|(_, c)| round1(c as f64 / total * 100.0)),
        description: description(primary).to_string(),
        recommendations: recommendations(primary).iter().map(|s| s.to_string()).collect(),
        characteristics: characteristics(primary).iter().map(|s| s.to_string()).collect(),
    })
}

pub fn description(dosha: Dosha) -> &'static str {
    match dosha {
        Dosha::Vata => {
            "Vata dosha represents air and space elements. You tend to be creative, \
             energetic, and quick-thinking, but may experience anxiety, dry skin, and \
             irregular digestion when imbalanced."
        }
        Dosha::Pitta => {
            "Pitta dosha represents fire and water elements. You tend to be intelligent, \
             focused, and warm, but may experience inflammation, acidity, and \
             irritability when imbalanced."
        }
        Dosha::Kapha => {
            "Kapha dosha represents earth and water elements. You tend to be calm, \
             stable, and nurturing, but may experience sluggishness, weight gain, and \
             congestion when imbalanced."
        }
    }
}

pub fn recommendations(dosha: Dosha) -> &'static [&'static str] {
    match dosha {
        Dosha::Vata => &[
            "Favor warm, cooked, and nourishing foods",
            "Maintain regular daily routines",
            "Practice grounding yoga poses and meditation",
            "Use warming spices like ginger and cinnamon",
            "Get adequate rest and avoid overstimulation",
        ],
        Dosha::Pitta => &[
            "Favor cool, refreshing foods and avoid spicy foods",
            "Practice cooling pranayama and meditation",
            "Avoid excessive heat and sun exposure",
            "Use cooling herbs like coriander and fennel",
            "Maintain work-life balance and avoid overworking",
        ],
        Dosha::Kapha => &[
            "Favor light, warm, and stimulating foods",
            "Engage in regular vigorous exercise",
            "Use warming spices like black pepper and turmeric",
            "Avoid heavy, oily, and cold foods",
            "Maintain an active lifestyle and avoid oversleeping",
        ],
    }
}

pub fn characteristics(dosha: Dosha) -> &'static [&'static str] {
    match dosha {
        Dosha::Vata => &[
            "Light, thin body frame",
            "Variable energy and appetite",
            "Quick mind, creative",
            "Tendency toward dry skin",
            "Light, interrupted sleep",
        ],
        Dosha::Pitta => &[
            "Medium build, good muscle tone",
            "Strong appetite and digestion",
            "Sharp intellect, focused",
            "Warm body temperature",
            "Moderate, sound sleep",
        ],
        Dosha::Kapha => &[
            "Solid, heavier build",
            "Steady energy and appetite",
            "Calm, patient nature",
            "Smooth, moist skin",
            "Deep, long sleep",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{rank_remedies, RankedRemedy};
    use crate::remedy::Remedy;

    fn remedy(id: &str, dosha: &str, tags: &[&str]) -> Remedy {
        Remedy {
            id: id.to_string(),
            name: format!("Remedy {id}"),
            name_hi: None,
            herb: "Herb".into(),
            herb_hi: None,
            herb_scientific: None,
            dosage: "Daily".into(),
            dosage_hi: None,
            yoga: "Asana".into(),
            yoga_hi: None,
            diet: "Light".into(),
            diet_hi: None,
            dosha: dosha.to_string(),
            dosha_hi: None,
            warning: "None".into(),
            warning_hi: None,
            explanation: "Works".into(),
            explanation_hi: None,
            symptoms: tags.iter().map(|t| t.to_string()).collect(),
            category: None,
        }
    }

    fn ranked_fixture() -> Vec<RankedRemedy> {
        let catalog = vec![
            remedy("a", "Balances Pitta", &["cough"]),
            remedy("b", "Balances Vata and Kapha", &["cough", "fever"]),
        ];
        rank_remedies(&["cough".to_string()], &catalog, 3)
    }

    fn profile(primary: Dosha) -> DoshaProfile {
        DoshaProfile {
            primary,
            secondary: None,
            assessment_date: None,
        }
    }

    #[test]
    fn boost_is_exact_and_reorders() {
        let mut ranked = ranked_fixture();
        // Before: a=100.00 (Pitta), b=50.00 (Vata).
        adjust_by_dosha(&profile(Dosha::Vata), &mut ranked, DEFAULT_DOSHA_BOOST);
        let b = ranked.iter().find(|r| r.remedy.id == "b").unwrap();
        assert_eq!(b.match_score, 50.0 * 1.2);
        assert!(b.dosha_adjusted);
        let a = ranked.iter().find(|r| r.remedy.id == "a").unwrap();
        assert_eq!(a.match_score, 100.0);
        assert!(!a.dosha_adjusted);
        // 100 still beats 60; order a then b.
        assert_eq!(ranked[0].remedy.id, "a");
    }

    #[test]
    fn boost_can_overtake_on_resort() {
        let catalog = vec![
            remedy("a", "Balances Pitta", &["cough", "fever", "chills"]),
            remedy("b", "Balances Vata", &["cough"]),
        ];
        let mut ranked = rank_remedies(
            &["cough".to_string(), "fever".to_string()],
            &catalog,
            3,
        );
        // a=66.67, b=100.00 -> b leads already; boost a's rival instead.
        adjust_by_dosha(&profile(Dosha::Pitta), &mut ranked, 2.0);
        // a doubled to 133.34, overtakes b.
        assert_eq!(ranked[0].remedy.id, "a");
        assert!(ranked[0].dosha_adjusted);
    }

    #[test]
    fn balances_phrase_matches_by_substring() {
        let mut ranked = ranked_fixture();
        adjust_by_dosha(&profile(Dosha::Kapha), &mut ranked, DEFAULT_DOSHA_BOOST);
        let b = ranked.iter().find(|r| r.remedy.id == "b").unwrap();
        assert!(b.dosha_adjusted);
    }

    #[test]
    fn matched_symptoms_survive_adjustment() {
        let mut ranked = ranked_fixture();
        let before: Vec<Vec<String>> = ranked.iter().map(|r| r.matched_symptoms.clone()).collect();
        adjust_by_dosha(&profile(Dosha::Vata), &mut ranked, DEFAULT_DOSHA_BOOST);
        let mut after: Vec<Vec<String>> = ranked.iter().map(|r| r.matched_symptoms.clone()).collect();
        after.sort();
        let mut before_sorted = before;
        before_sorted.sort();
        assert_eq!(before_sorted, after);
    }

    #[test]
    fn quiz_majority_wins_with_percentages() {
        let answers: Vec<QuizAnswer> = [Dosha::Vata, Dosha::Vata, Dosha::Vata, Dosha::Pitta, Dosha::Kapha]
            .iter()
            .enumerate()
            .map(|(i, &d)| QuizAnswer {
                question_id: i as u32 + 1,
                answer: d,
            })
            .collect();
        let result = assess_quiz(&answers).expect("assessment");
        assert_eq!(result.primary, Dosha::Vata);
        assert_eq!(result.primary_percentage, 60.0);
        assert_eq!(result.secondary, Some(Dosha::Pitta));
        assert_eq!(result.secondary_percentage, Some(20.0));
        assert!(result.description.starts_with("Vata dosha represents"));
        assert_eq!(result.recommendations.len(), 5);
        assert_eq!(result.characteristics.len(), 5);
    }

    #[test]
    fn quiz_tie_breaks_in_fixed_order() {
        let answers = vec![
            QuizAnswer { question_id: 1, answer: Dosha::Kapha },
            QuizAnswer { question_id: 2, answer: Dosha::Pitta },
        ];
        let result = assess_quiz(&answers).expect("assessment");
        // Equal counts: Pitta precedes Kapha in the fixed order.
        assert_eq!(result.primary, Dosha::Pitta);
        assert_eq!(result.secondary, Some(Dosha::Kapha));
        assert_eq!(result.primary_percentage, 50.0);
    }

    #[test]
    fn single_dosha_quiz_has_no_secondary() {
        let answers = vec![
            QuizAnswer { question_id: 1, answer: Dosha::Kapha },
            QuizAnswer { question_id: 2, answer: Dosha::Kapha },
        ];
        let result = assess_quiz(&answers).expect("assessment");
        assert_eq!(result.primary, Dosha::Kapha);
        assert_eq!(result.primary_percentage, 100.0);
        assert_eq!(result.secondary, None);
        assert_eq!(result.secondary_percentage, None);
    }

    #[test]
    fn empty_quiz_is_rejected() {
        assert!(assess_quiz(&[]).is_none());
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let answers = vec![
            QuizAnswer { question_id: 1, answer: Dosha::Vata },
            QuizAnswer { question_id: 2, answer: Dosha::Vata },
            QuizAnswer { question_id: 3, answer: Dosha::Pitta },
        ];
        let result = assess_quiz(&answers).expect("assessment");
        assert_eq!(result.primary_percentage, 66.7);
        assert_eq!(result.secondary_percentage, Some(33.3));
    }

    #[test]
    fn dosha_serde_is_capitalized_out_case_insensitive_in() {
        assert_eq!(serde_json::to_string(&Dosha::Vata).unwrap(), "\"Vata\"");
        let parsed: Dosha = serde_json::from_str("\"vata\"").unwrap();
        assert_eq!(parsed, Dosha::Vata);
        let parsed: Dosha = serde_json::from_str("\"KAPHA\"").unwrap();
        assert_eq!(parsed, Dosha::Kapha);
        assert!(serde_json::from_str::<Dosha>("\"fire\"").is_err());
    }
}
