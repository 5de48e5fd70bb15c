//! Relevance scoring and ranking over the remedy catalog.
//!
//! Scoring is pure and synchronous: keyword/tag overlap by bidirectional
//! substring, first matching tag wins per keyword, and the score is the
//! share of distinct tags matched. Ranking keeps positive scores only and
//! breaks score ties by remedy id so results are stable across runs.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::remedy::Remedy;

/// Default cap on ranked results handed to the adjustment stage.
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Outcome of scoring one catalog entry against the query keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 0..=100, rounded to 2 decimals.
    pub score: f64,
    /// Distinct matched tags in original catalog casing, first-match order.
    pub matched_symptoms: Vec<String>,
    pub match_count: usize,
    pub total_possible: usize,
}

/// A catalog entry that scored above zero, carrying its match metadata
/// through ranking and dosha adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRemedy {
    pub remedy: Remedy,
    pub match_score: f64,
    pub matched_symptoms: Vec<String>,
    pub match_count: usize,
    pub dosha_adjusted: bool,
}

impl RankedRemedy {
    fn new(remedy: Remedy, result: MatchResult) -> Self {
        Self {
            remedy,
            match_score: result.score,
            matched_symptoms: result.matched_symptoms,
            match_count: result.match_count,
            dosha_adjusted: false,
        }
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Score one entry. Each keyword may claim at most one tag (the first that
/// contains it or is contained by it, case-insensitively); a tag already
/// claimed is not counted twice, so duplicate keywords cannot inflate the
/// score. Zero tags score zero.
pub fn score_remedy(keywords: &[String], tags: &[String]) -> MatchResult {
    let mut matched: Vec<String> = Vec::new();
    for keyword in keywords {
        for tag in tags {
            let tag_lower = tag.to_lowercase();
            if tag_lower.contains(keyword.as_str()) || keyword.contains(tag_lower.as_str()) {
                if !matched.contains(tag) {
                    matched.push(tag.clone());
                }
                break;
            }
        }
    }
    let total_possible = tags.len();
    let score = if total_possible > 0 {
        round2(matched.len() as f64 / total_possible as f64 * 100.0)
    } else {
        0.0
    };
    MatchResult {
        score,
        match_count: matched.len(),
        matched_symptoms: matched,
        total_possible,
    }
}

/// Rank the catalog: positive scores only, ordered by score descending with
/// remedy id ascending on ties, truncated to `max`.
pub fn rank_remedies(keywords: &[String], catalog: &[Remedy], max: usize) -> Vec<RankedRemedy> {
    let mut ranked: Vec<RankedRemedy> = catalog
        .iter()
        .filter_map(|remedy| {
            let result = score_remedy(keywords, &remedy.symptoms);
            (result.score > 0.0).then(|| RankedRemedy::new(remedy.clone(), result))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.remedy.id.cmp(&b.remedy.id))
    });
    ranked.truncate(max);
    ranked
}

/// Degraded mode: first positive-scoring entry in catalog order, alone.
pub fn first_match(keywords: &[String], catalog: &[Remedy]) -> Vec<RankedRemedy> {
    for remedy in catalog {
        let result = score_remedy(keywords, &remedy.symptoms);
        if result.score > 0.0 {
            return vec![RankedRemedy::new(remedy.clone(), result)];
        }
    }
    Vec::new()
}
