//! AI fallback for uncatalogued symptoms: the prompt contract, the labeled
//! line parser, and the fixed records returned when the provider is
//! unconfigured or failing.

use std::collections::HashMap;

use crate::ai::{AiError, CompletionProvider};
use crate::remedy::{AnswerSource, Language, RemedyAnswer};

/// Build the completion prompt. The reply contract is ten labeled lines;
/// the parser below tolerates missing or reordered lines.
pub fn build_prompt(symptom: &str, language: Language) -> String {
    let lang_instruction = match language {
        Language::Hi => "Respond in Hindi (Devanagari script)",
        Language::En => "Respond in English",
    };
    format!(
        r#"You are an expert Ayurvedic wellness assistant. A user reports: "{symptom}"

{lang_instruction}

Provide a practical Ayurvedic remedy in this EXACT format:

REMEDY_NAME: [Short descriptive name]
HERB: [Primary herb name]
HERB_SCIENTIFIC: [Scientific Latin name]
DOSAGE: [Practical dosage instruction]
YOGA: [Specific yoga pose or pranayama]
DIET: [Dietary recommendations]
DOSHA: [Which dosha imbalance - Vata/Pitta/Kapha]
WARNING: [Important safety note]
EXPLANATION: [Why this remedy works - cite Ayurvedic principles]
CATEGORY: [One of: respiratory, digestive, mental, sleep, musculoskeletal, dermatological, metabolic, reproductive, neurological]

Keep each field concise (1-2 sentences). Base recommendations on classical Ayurveda."#
    )
}

/// Split the reply into labeled fields: one per line, key before the first
/// colon, keys lowercased with spaces as underscores. Later duplicates win.
fn parse_fields(reply: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in reply.trim().lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase().replace(' ', "_");
            fields.insert(key, value.trim().to_string());
        }
    }
    fields
}

/// Turn a provider reply into the answer record, filling absent fields with
/// the fixed defaults. A field present but empty stays empty.
pub fn parse_remedy_reply(reply: &str) -> RemedyAnswer {
    let mut fields = parse_fields(reply);
    let mut take =
        |key: &str, default: &str| fields.remove(key).unwrap_or_else(|| default.to_string());
    RemedyAnswer {
        success: true,
        remedy_id: None,
        remedy_name: take("remedy_name", "AI-Suggested Ayurvedic Remedy"),
        herb: take("herb", "Consult Ayurvedic practitioner"),
        herb_scientific: Some(take("herb_scientific", "")),
        dosage: take("dosage", "As directed by qualified practitioner"),
        yoga: take("yoga", "General yoga practice"),
        diet: take("diet", "Balanced Sattvic diet"),
        dosha: take("dosha", "Assessment needed"),
        warning: take(
            "warning",
            "Always consult qualified Ayurvedic practitioner before starting any remedy",
        ),
        explanation: take(
            "explanation",
            "AI-generated recommendation based on Ayurvedic principles",
        ),
        source: AnswerSource::Ai,
        category: Some(take("category", "general")),
        match_score: None,
        matched_symptoms: None,
        dosha_adjusted: None,
    }
}

/// Fixed record for keyless deployments. Never persisted to history.
pub fn unavailable_answer() -> RemedyAnswer {
    RemedyAnswer {
        success: false,
        remedy_id: None,
        remedy_name: "AI Service Unavailable".to_string(),
        herb: "Consult Ayurvedic practitioner".to_string(),
        herb_scientific: Some(String::new()),
        dosage: "N/A".to_string(),
        yoga: "General yoga practice".to_string(),
        diet: "Balanced Ayurvedic diet".to_string(),
        dosha: "Professional assessment needed".to_string(),
        warning: "API key not configured. Please consult qualified Ayurvedic practitioner."
            .to_string(),
        explanation: "AI service requires API key configuration.".to_string(),
        source: AnswerSource::Error,
        category: Some("general".to_string()),
        match_score: None,
        matched_symptoms: None,
        dosha_adjusted: None,
    }
}

/// Fixed record for transport or provider failures. Never persisted.
pub fn error_answer() -> RemedyAnswer {
    RemedyAnswer {
        success: false,
        remedy_id: None,
        remedy_name: "AI Error".to_string(),
        herb: "Service temporarily unavailable".to_string(),
        herb_scientific: Some(String::new()),
        dosage: "N/A".to_string(),
        yoga: "N/A".to_string(),
        diet: "N/A".to_string(),
        dosha: "N/A".to_string(),
        warning: "AI service error. Please consult Ayurvedic practitioner.".to_string(),
        explanation: "Unable to generate recommendation at this time.".to_string(),
        source: AnswerSource::Error,
        category: Some("error".to_string()),
        match_score: None,
        matched_symptoms: None,
        dosha_adjusted: None,
    }
}

/// Ask the provider for a remedy. Failures degrade to the fixed records;
/// this function never errors and never logs the raw symptom.
pub async fn ai_fallback(
    provider: &dyn CompletionProvider,
    symptom: &str,
    language: Language,
) -> RemedyAnswer {
    let prompt = build_prompt(symptom, language);
    match provider.complete(&prompt).await {
        Ok(reply) => {
            tracing::info!(chars = reply.len(), provider = provider.name(), "ai reply received");
            parse_remedy_reply(&reply)
        }
        Err(AiError::Unconfigured) => unavailable_answer(),
        Err(err) => {
            tracing::warn!(error = %err, provider = provider.name(), "ai fallback failed");
            error_answer()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DisabledProvider, MockProvider};

    const FULL_REPLY: &str = "REMEDY_NAME: Ashwagandha Tonic\n\
         HERB: Ashwagandha\n\
         HERB_SCIENTIFIC: Withania somnifera\n\
         DOSAGE: 1 tsp with warm milk at night\n\
         YOGA: Shavasana\n\
         DIET: Warm, grounding meals\n\
         DOSHA: Vata\n\
         WARNING: Avoid during pregnancy\n\
         EXPLANATION: Calms the nervous system\n\
         CATEGORY: mental";

    #[test]
    fn parses_all_labeled_lines() {
        let answer = parse_remedy_reply(FULL_REPLY);
        assert_eq!(answer.remedy_name, "Ashwagandha Tonic");
        assert_eq!(answer.herb, "Ashwagandha");
        assert_eq!(answer.herb_scientific.as_deref(), Some("Withania somnifera"));
        assert_eq!(answer.dosha, "Vata");
        assert_eq!(answer.category.as_deref(), Some("mental"));
        assert_eq!(answer.source, AnswerSource::Ai);
        assert!(answer.success);
        assert!(answer.match_score.is_none());
        assert!(answer.dosha_adjusted.is_none());
    }

    #[test]
    fn missing_fields_take_fixed_defaults() {
        let answer = parse_remedy_reply("HERB: Ginger\nsome prose without label");
        assert_eq!(answer.herb, "Ginger");
        assert_eq!(answer.remedy_name, "AI-Suggested Ayurvedic Remedy");
        assert_eq!(answer.dosha, "Assessment needed");
        assert_eq!(answer.diet, "Balanced Sattvic diet");
        assert_eq!(answer.herb_scientific.as_deref(), Some(""));
        assert_eq!(answer.category.as_deref(), Some("general"));
    }

    #[test]
    fn keys_with_spaces_and_casing_are_canonicalized() {
        let answer = parse_remedy_reply("Remedy Name: Trikatu Mix\nherb: Pippali");
        assert_eq!(answer.remedy_name, "Trikatu Mix");
        assert_eq!(answer.herb, "Pippali");
    }

    #[test]
    fn value_keeps_colons_after_the_first() {
        let answer = parse_remedy_reply("DOSAGE: morning: 1 tsp, night: 2 tsp");
        assert_eq!(answer.dosage, "morning: 1 tsp, night: 2 tsp");
    }

    #[test]
    fn prompt_carries_symptom_and_language() {
        let en = build_prompt("burning eyes", Language::En);
        assert!(en.contains("\"burning eyes\""));
        assert!(en.contains("Respond in English"));
        assert!(en.contains("REMEDY_NAME:"));
        let hi = build_prompt("burning eyes", Language::Hi);
        assert!(hi.contains("Respond in Hindi (Devanagari script)"));
    }

    #[tokio::test]
    async fn unconfigured_provider_yields_unavailable_record() {
        let answer = ai_fallback(&DisabledProvider, "rare symptom", Language::En).await;
        assert_eq!(answer.remedy_name, "AI Service Unavailable");
        assert_eq!(answer.source, AnswerSource::Error);
        assert!(!answer.success);
        assert_eq!(answer.category.as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn mock_provider_yields_parsed_ai_answer() {
        let provider = MockProvider::new(FULL_REPLY);
        let answer = ai_fallback(&provider, "cannot sleep", Language::En).await;
        assert_eq!(answer.source, AnswerSource::Ai);
        assert_eq!(answer.remedy_name, "Ashwagandha Tonic");
    }
}
