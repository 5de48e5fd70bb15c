//! The query pipeline: normalize, screen for emergencies, rank the catalog,
//! personalize by dosha, and fall back to the AI provider, with every
//! external seam degrading instead of failing the query.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ai::SharedProvider;
use crate::config::PipelineConfig;
use crate::dosha::{adjust_by_dosha, Dosha};
use crate::emergency::{detect_emergency, EmergencySignal};
use crate::fallback::ai_fallback;
use crate::matching::{first_match, rank_remedies};
use crate::normalize::{normalize_symptom, SymptomQuery};
use crate::remedy::{AnswerSource, HistoryRecord, Language, RemedyAnswer};
use crate::store::SharedStore;

/// Short digest for log correlation; raw symptom text is never logged.
fn anon_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// What a query resolves to: a safety alert or a remedy-shaped answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Emergency(EmergencySignal),
    Answer(RemedyAnswer),
}

/// Orchestrator over the injected collaborators. Pure stages are free
/// functions; this type owns only order, degradation, and history.
pub struct Pipeline {
    store: SharedStore,
    ai: SharedProvider,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(store: SharedStore, ai: SharedProvider, config: PipelineConfig) -> Self {
        Self { store, ai, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer one symptom query. Never errors: storage trouble degrades to
    /// the AI fallback, AI trouble degrades to the fixed error records.
    pub async fn answer(
        &self,
        symptom: &str,
        language: Language,
        user_id: Option<&str>,
    ) -> QueryOutcome {
        let started = Instant::now();
        counter!("queries_total").increment(1);

        let query = normalize_symptom(symptom);
        tracing::info!(
            id = %anon_hash(&query.original),
            keywords = query.keywords.len(),
            lang = language.as_str(),
            identified = user_id.is_some(),
            "query received"
        );

        if self.config.emergency_detection {
            if let Some(signal) = detect_emergency(&query.normalized) {
                counter!("emergency_detections_total").increment(1);
                tracing::warn!(keyword = %signal.detected_keyword, "emergency phrase detected");
                histogram!("query_pipeline_ms").record(elapsed_ms(started));
                return QueryOutcome::Emergency(signal);
            }
        }

        let catalog = match self.store.fetch_all_remedies().await {
            Ok(rows) => rows,
            Err(err) => {
                counter!("store_errors_total", "op" => "fetch_all_remedies").increment(1);
                tracing::warn!(error = %err, "catalog fetch failed, continuing with empty catalog");
                Vec::new()
            }
        };

        let mut ranked = if self.config.ranked_matching {
            rank_remedies(&query.keywords, &catalog, self.config.max_results)
        } else {
            first_match(&query.keywords, &catalog)
        };

        if ranked.is_empty() {
            counter!("ai_fallbacks_total").increment(1);
            tracing::info!(id = %anon_hash(&query.original), "no catalog match, using ai fallback");
            let answer = ai_fallback(self.ai.as_ref(), &query.original, language).await;
            self.log_history(user_id, &query, language, &answer, None, None, started)
                .await;
            histogram!("query_pipeline_ms").record(elapsed_ms(started));
            return QueryOutcome::Answer(answer);
        }

        let mut dosha_used: Option<Dosha> = None;
        if self.config.dosha_adjustment {
            if let Some(uid) = user_id {
                match self.store.fetch_dosha_profile(uid).await {
                    Ok(Some(profile)) => {
                        adjust_by_dosha(&profile, &mut ranked, self.config.dosha_boost);
                        dosha_used = Some(profile.primary);
                    }
                    Ok(None) => {
                        tracing::debug!("no dosha profile, skipping adjustment");
                    }
                    Err(err) => {
                        counter!("store_errors_total", "op" => "fetch_dosha_profile").increment(1);
                        tracing::warn!(error = %err, "dosha profile fetch failed, skipping adjustment");
                    }
                }
            }
        }

        let top = &ranked[0];
        tracing::info!(
            remedy = %top.remedy.id,
            score = top.match_score,
            adjusted = top.dosha_adjusted,
            "dataset answer"
        );
        let answer = RemedyAnswer::from_catalog(
            &top.remedy,
            language,
            top.match_score,
            top.matched_symptoms.clone(),
            top.dosha_adjusted,
        );
        self.log_history(
            user_id,
            &query,
            language,
            &answer,
            Some(top.remedy.name.as_str()),
            dosha_used,
            started,
        )
        .await;
        histogram!("query_pipeline_ms").record(elapsed_ms(started));
        QueryOutcome::Answer(answer)
    }

    /// Best-effort history append for identified users. Error-source answers
    /// are never persisted; the history row always records the English
    /// remedy name. Failures are logged, never propagated.
    #[allow(clippy::too_many_arguments)]
    async fn log_history(
        &self,
        user_id: Option<&str>,
        query: &SymptomQuery,
        language: Language,
        answer: &RemedyAnswer,
        english_name: Option<&str>,
        dosha_used: Option<Dosha>,
        started: Instant,
    ) {
        let Some(uid) = user_id else {
            return;
        };
        if answer.source == AnswerSource::Error {
            return;
        }
        let enriched = self.config.history_enrichment;
        let record = HistoryRecord {
            user_id: uid.to_string(),
            symptom: query.original.clone(),
            language,
            remedy_id: answer.remedy_id.clone(),
            remedy_name: english_name.unwrap_or(&answer.remedy_name).to_string(),
            source: answer.source,
            matched_keywords: enriched.then(|| query.keywords.clone()),
            dosha_used: if enriched {
                dosha_used.map(|d| d.label().to_string())
            } else {
                None
            },
            ranking_score: if enriched { answer.match_score } else { None },
            ai_refinement_used: enriched.then_some(answer.source == AnswerSource::Ai),
            response_time_ms: enriched.then(|| elapsed_ms(started)),
        };
        if let Err(err) = self.store.append_history(&record).await {
            counter!("history_write_failures_total").increment(1);
            tracing::warn!(error = %err, "history write failed");
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
