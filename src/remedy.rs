//! Core records: catalog rows, the uniform answer shape, and the
//! history/saved-remedy rows exchanged with storage.

use serde::{Deserialize, Serialize};

/// Response language. Hindi projection falls back per-field to English
/// wherever a translation is missing or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }
}

/// Where an answer came from. `Error` marks the fixed records returned when
/// the AI collaborator is unconfigured or failing; those are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Dataset,
    Ai,
    Error,
}

/// One catalog row as stored in the `remedies` table. The `symptoms` list
/// carries the matching tags; `*_hi` columns hold optional Hindi copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remedy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_hi: Option<String>,
    pub herb: String,
    #[serde(default)]
    pub herb_hi: Option<String>,
    #[serde(default)]
    pub herb_scientific: Option<String>,
    pub dosage: String,
    #[serde(default)]
    pub dosage_hi: Option<String>,
    pub yoga: String,
    #[serde(default)]
    pub yoga_hi: Option<String>,
    pub diet: String,
    #[serde(default)]
    pub diet_hi: Option<String>,
    pub dosha: String,
    #[serde(default)]
    pub dosha_hi: Option<String>,
    pub warning: String,
    #[serde(default)]
    pub warning_hi: Option<String>,
    pub explanation: String,
    #[serde(default)]
    pub explanation_hi: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn pick<'a>(lang: Language, en: &'a str, hi: Option<&'a str>) -> &'a str {
    match (lang, hi) {
        (Language::Hi, Some(h)) if !h.is_empty() => h,
        _ => en,
    }
}

impl Remedy {
    pub fn name_in(&self, lang: Language) -> &str {
        pick(lang, &self.name, self.name_hi.as_deref())
    }

    pub fn herb_in(&self, lang: Language) -> &str {
        pick(lang, &self.herb, self.herb_hi.as_deref())
    }

    pub fn dosage_in(&self, lang: Language) -> &str {
        pick(lang, &self.dosage, self.dosage_hi.as_deref())
    }

    pub fn yoga_in(&self, lang: Language) -> &str {
        pick(lang, &self.yoga, self.yoga_hi.as_deref())
    }

    pub fn diet_in(&self, lang: Language) -> &str {
        pick(lang, &self.diet, self.diet_hi.as_deref())
    }

    pub fn dosha_in(&self, lang: Language) -> &str {
        pick(lang, &self.dosha, self.dosha_hi.as_deref())
    }

    pub fn warning_in(&self, lang: Language) -> &str {
        pick(lang, &self.warning, self.warning_hi.as_deref())
    }

    pub fn explanation_in(&self, lang: Language) -> &str {
        pick(lang, &self.explanation, self.explanation_hi.as_deref())
    }
}

/// The uniform answer record returned by the query endpoint regardless of
/// which stage produced it. Match metadata is present only on dataset hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedyAnswer {
    pub success: bool,
    pub remedy_id: Option<String>,
    pub remedy_name: String,
    pub herb: String,
    pub herb_scientific: Option<String>,
    pub dosage: String,
    pub yoga: String,
    pub diet: String,
    pub dosha: String,
    pub warning: String,
    pub explanation: String,
    pub source: AnswerSource,
    pub category: Option<String>,
    pub match_score: Option<f64>,
    pub matched_symptoms: Option<Vec<String>>,
    pub dosha_adjusted: Option<bool>,
}

impl RemedyAnswer {
    /// Project a catalog hit into the answer shape in the requested language.
    pub fn from_catalog(
        remedy: &Remedy,
        lang: Language,
        match_score: f64,
        matched_symptoms: Vec<String>,
        dosha_adjusted: bool,
    ) -> Self {
        Self {
            success: true,
            remedy_id: Some(remedy.id.clone()),
            remedy_name: remedy.name_in(lang).to_string(),
            herb: remedy.herb_in(lang).to_string(),
            herb_scientific: remedy.herb_scientific.clone(),
            dosage: remedy.dosage_in(lang).to_string(),
            yoga: remedy.yoga_in(lang).to_string(),
            diet: remedy.diet_in(lang).to_string(),
            dosha: remedy.dosha_in(lang).to_string(),
            warning: remedy.warning_in(lang).to_string(),
            explanation: remedy.explanation_in(lang).to_string(),
            source: AnswerSource::Dataset,
            category: remedy.category.clone(),
            match_score: Some(match_score),
            matched_symptoms: Some(matched_symptoms),
            dosha_adjusted: Some(dosha_adjusted),
        }
    }
}

/// Row written to `query_history`. Enrichment columns are omitted (not
/// nulled) when history enrichment is toggled off, so the minimal insert
/// stays compatible with the reduced schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user_id: String,
    pub symptom: String,
    pub language: Language,
    pub remedy_id: Option<String>,
    pub remedy_name: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosha_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_refinement_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

/// Row read back from `query_history` for the history endpoint. The stored
/// column is `ranking_score`; clients see it as `match_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub symptom: String,
    pub remedy_name: String,
    pub source: AnswerSource,
    pub language: Language,
    pub created_at: String,
    #[serde(default, alias = "ranking_score")]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub dosha_used: Option<String>,
}

/// Insert shape for `saved_remedies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRemedy {
    pub user_id: String,
    pub remedy_id: String,
    pub remedy_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Row read back from `saved_remedies`, with the catalog row embedded when
/// storage supports the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRemedyRow {
    pub id: String,
    pub remedy_id: String,
    pub remedy_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub remedies: Option<Remedy>,
}

/// Result of a save attempt; duplicates are reported, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Option<String>),
    AlreadySaved,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_remedy() -> Remedy {
        Remedy {
            id: "r-1".into(),
            name: "Tulsi Kadha".into(),
            name_hi: Some("तुलसी काढ़ा".into()),
            herb: "Holy Basil".into(),
            herb_hi: None,
            herb_scientific: Some("Ocimum sanctum".into()),
            dosage: "Twice daily".into(),
            dosage_hi: Some(String::new()),
            yoga: "Bhramari pranayama".into(),
            yoga_hi: None,
            diet: "Warm fluids".into(),
            diet_hi: None,
            dosha: "Balances Kapha and Vata".into(),
            dosha_hi: None,
            warning: "Avoid during pregnancy".into(),
            warning_hi: None,
            explanation: "Clears respiratory channels".into(),
            explanation_hi: None,
            symptoms: vec!["cough".into(), "cold".into()],
            category: Some("respiratory".into()),
        }
    }

    #[test]
    fn hindi_projection_falls_back_per_field() {
        let r = sample_remedy();
        assert_eq!(r.name_in(Language::Hi), "तुलसी काढ़ा");
        // Missing translation falls back.
        assert_eq!(r.herb_in(Language::Hi), "Holy Basil");
        // Empty translation falls back too.
        assert_eq!(r.dosage_in(Language::Hi), "Twice daily");
        assert_eq!(r.name_in(Language::En), "Tulsi Kadha");
    }

    #[test]
    fn answer_serde_shape() {
        let answer = RemedyAnswer::from_catalog(
            &sample_remedy(),
            Language::En,
            50.0,
            vec!["cough".into()],
            false,
        );
        let v = serde_json::to_value(&answer).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["source"], "dataset");
        assert_eq!(v["remedy_id"], "r-1");
        assert_eq!(v["match_score"], 50.0);
        assert_eq!(v["dosha_adjusted"], false);
    }

    #[test]
    fn history_record_omits_absent_enrichment() {
        let record = HistoryRecord {
            user_id: "u-1".into(),
            symptom: "cough".into(),
            language: Language::En,
            remedy_id: Some("r-1".into()),
            remedy_name: "Tulsi Kadha".into(),
            source: AnswerSource::Dataset,
            matched_keywords: None,
            dosha_used: None,
            ranking_score: None,
            ai_refinement_used: None,
            response_time_ms: None,
        };
        let v = serde_json::to_value(&record).unwrap();
        assert!(v.get("matched_keywords").is_none());
        assert!(v.get("ranking_score").is_none());
        assert_eq!(v["language"], "en");
        assert_eq!(v["source"], "dataset");
    }
}
