//! Storage collaborator: remedy catalog, dosha profiles, query history, and
//! saved remedies behind one trait so the pipeline and handlers can run
//! against an in-memory fake in tests and keyless local setups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::dosha::{Dosha, DoshaProfile, QuizAnswer};
use crate::remedy::{HistoryItem, HistoryRecord, Remedy, SaveOutcome, SavedRemedy, SavedRemedyRow};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What went wrong talking to storage. Callers decide whether to degrade
/// (the query pipeline) or surface the failure (the read endpoints).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Profile fields written after a quiz assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub dosha_primary: Dosha,
    pub dosha_secondary: Option<Dosha>,
    pub dosha_assessment_date: String,
    pub dosha_quiz_answers: Vec<QuizAnswer>,
}

#[async_trait]
pub trait RemedyStore: Send + Sync {
    async fn fetch_all_remedies(&self) -> Result<Vec<Remedy>, StoreError>;
    async fn list_remedies(&self, category: Option<&str>) -> Result<Vec<Remedy>, StoreError>;
    async fn fetch_dosha_profile(&self, user_id: &str) -> Result<Option<DoshaProfile>, StoreError>;
    async fn save_dosha_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError>;
    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;
    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, StoreError>;
    async fn save_remedy(&self, entry: &SavedRemedy) -> Result<SaveOutcome, StoreError>;
    async fn saved_remedies(&self, user_id: &str) -> Result<Vec<SavedRemedyRow>, StoreError>;
    async fn unsave_remedy(&self, user_id: &str, remedy_id: &str) -> Result<(), StoreError>;
    async fn is_saved(&self, user_id: &str, remedy_id: &str) -> Result<bool, StoreError>;
}

pub type SharedStore = Arc<dyn RemedyStore>;

fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(StoreError::Status(resp.status()))
    }
}

/// Supabase PostgREST client. One base URL, service key on every request,
/// query-string filters, explicit timeouts.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ayush-assistant/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        let base: String = base_url.into();
        Self {
            http,
            base_url: base.trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn get(&self, table: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, table)
    }
}

#[async_trait]
impl RemedyStore for SupabaseStore {
    async fn fetch_all_remedies(&self) -> Result<Vec<Remedy>, StoreError> {
        let resp = self
            .get("remedies")
            .query(&[("select", "*")])
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    async fn list_remedies(&self, category: Option<&str>) -> Result<Vec<Remedy>, StoreError> {
        let mut req = self.get("remedies").query(&[("select", "*")]);
        if let Some(cat) = category {
            req = req.query(&[("category", format!("eq.{cat}"))]);
        }
        let resp = req.send().await?;
        Ok(check(resp)?.json().await?)
    }

    async fn fetch_dosha_profile(&self, user_id: &str) -> Result<Option<DoshaProfile>, StoreError> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default)]
            dosha_primary: Option<String>,
            #[serde(default)]
            dosha_secondary: Option<String>,
            #[serde(default)]
            dosha_assessment_date: Option<String>,
        }
        let resp = self
            .get("profiles")
            .query(&[(
                "select",
                "dosha_primary,dosha_secondary,dosha_assessment_date",
            )])
            .query(&[("id", format!("eq.{user_id}"))])
            .send()
            .await?;
        let rows: Vec<Row> = check(resp)?.json().await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let Some(raw_primary) = row.dosha_primary else {
            return Ok(None);
        };
        let Ok(primary) = raw_primary.parse() else {
            tracing::warn!(label = %raw_primary, "profile has unrecognized dosha label; ignoring");
            return Ok(None);
        };
        Ok(Some(DoshaProfile {
            primary,
            secondary: row.dosha_secondary.and_then(|s| s.parse().ok()),
            assessment_date: row.dosha_assessment_date,
        }))
    }

    async fn save_dosha_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError> {
        let resp = self
            .request(reqwest::Method::PATCH, "profiles")
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;
        check(resp).map(|_| ())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let resp = self
            .request(reqwest::Method::POST, "query_history")
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        check(resp).map(|_| ())
    }

    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, StoreError> {
        let resp = self
            .get("query_history")
            .query(&[(
                "select",
                "id,symptom,remedy_name,source,language,created_at,ranking_score,dosha_used",
            )])
            .query(&[("user_id", format!("eq.{user_id}"))])
            .query(&[("order", "created_at.desc")])
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    async fn save_remedy(&self, entry: &SavedRemedy) -> Result<SaveOutcome, StoreError> {
        if self.is_saved(&entry.user_id, &entry.remedy_id).await? {
            return Ok(SaveOutcome::AlreadySaved);
        }
        let resp = self
            .request(reqwest::Method::POST, "saved_remedies")
            .header("Prefer", "return=representation")
            .json(entry)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = check(resp)?.json().await?;
        let saved_id = rows.first().and_then(|row| match row.get("id") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        Ok(SaveOutcome::Saved(saved_id))
    }

    async fn saved_remedies(&self, user_id: &str) -> Result<Vec<SavedRemedyRow>, StoreError> {
        let resp = self
            .get("saved_remedies")
            .query(&[("select", "*,remedies(*)")])
            .query(&[("user_id", format!("eq.{user_id}"))])
            .query(&[("order", "saved_at.desc")])
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    async fn unsave_remedy(&self, user_id: &str, remedy_id: &str) -> Result<(), StoreError> {
        let resp = self
            .request(reqwest::Method::DELETE, "saved_remedies")
            .query(&[("user_id", format!("eq.{user_id}"))])
            .query(&[("remedy_id", format!("eq.{remedy_id}"))])
            .send()
            .await?;
        check(resp).map(|_| ())
    }

    async fn is_saved(&self, user_id: &str, remedy_id: &str) -> Result<bool, StoreError> {
        let resp = self
            .get("saved_remedies")
            .query(&[("select", "id")])
            .query(&[("user_id", format!("eq.{user_id}"))])
            .query(&[("remedy_id", format!("eq.{remedy_id}"))])
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = check(resp)?.json().await?;
        Ok(!rows.is_empty())
    }
}

struct StoredHistory {
    id: String,
    created_at: String,
    record: HistoryRecord,
}

struct StoredSaved {
    id: String,
    saved_at: String,
    entry: SavedRemedy,
}

/// In-memory store for tests and keyless local runs. Interior mutability so
/// it can sit behind `Arc<dyn RemedyStore>` like the real one.
#[derive(Default)]
pub struct MemoryStore {
    catalog: Vec<Remedy>,
    profiles: Mutex<HashMap<String, DoshaProfile>>,
    history: Mutex<Vec<StoredHistory>>,
    saved: Mutex<Vec<StoredSaved>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<Remedy>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Seed a profile directly, bypassing the quiz. Test helper.
    pub fn seed_profile(&self, user_id: &str, profile: DoshaProfile) {
        self.profiles
            .lock()
            .expect("profiles mutex poisoned")
            .insert(user_id.to_string(), profile);
    }

    /// Snapshot of everything written to history, oldest first.
    pub fn history_records(&self) -> Vec<HistoryRecord> {
        self.history
            .lock()
            .expect("history mutex poisoned")
            .iter()
            .map(|h| h.record.clone())
            .collect()
    }

    fn mint_id(&self) -> String {
        format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl RemedyStore for MemoryStore {
    async fn fetch_all_remedies(&self) -> Result<Vec<Remedy>, StoreError> {
        Ok(self.catalog.clone())
    }

    async fn list_remedies(&self, category: Option<&str>) -> Result<Vec<Remedy>, StoreError> {
        Ok(self
            .catalog
            .iter()
            .filter(|r| category.is_none() || r.category.as_deref() == category)
            .cloned()
            .collect())
    }

    async fn fetch_dosha_profile(&self, user_id: &str) -> Result<Option<DoshaProfile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("profiles mutex poisoned")
            .get(user_id)
            .cloned())
    }

    async fn save_dosha_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError> {
        self.profiles
            .lock()
            .expect("profiles mutex poisoned")
            .insert(
                user_id.to_string(),
                DoshaProfile {
                    primary: update.dosha_primary,
                    secondary: update.dosha_secondary,
                    assessment_date: Some(update.dosha_assessment_date.clone()),
                },
            );
        Ok(())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        self.history
            .lock()
            .expect("history mutex poisoned")
            .push(StoredHistory {
                id: self.mint_id(),
                created_at: Utc::now().to_rfc3339(),
                record: record.clone(),
            });
        Ok(())
    }

    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, StoreError> {
        Ok(self
            .history
            .lock()
            .expect("history mutex poisoned")
            .iter()
            .rev()
            .filter(|h| h.record.user_id == user_id)
            .take(limit)
            .map(|h| HistoryItem {
                id: h.id.clone(),
                symptom: h.record.symptom.clone(),
                remedy_name: h.record.remedy_name.clone(),
                source: h.record.source,
                language: h.record.language,
                created_at: h.created_at.clone(),
                match_score: h.record.ranking_score,
                dosha_used: h.record.dosha_used.clone(),
            })
            .collect())
    }

    async fn save_remedy(&self, entry: &SavedRemedy) -> Result<SaveOutcome, StoreError> {
        let mut saved = self.saved.lock().expect("saved mutex poisoned");
        let duplicate = saved
            .iter()
            .any(|s| s.entry.user_id == entry.user_id && s.entry.remedy_id == entry.remedy_id);
        if duplicate {
            return Ok(SaveOutcome::AlreadySaved);
        }
        let id = self.mint_id();
        saved.push(StoredSaved {
            id: id.clone(),
            saved_at: Utc::now().to_rfc3339(),
            entry: entry.clone(),
        });
        Ok(SaveOutcome::Saved(Some(id)))
    }

    async fn saved_remedies(&self, user_id: &str) -> Result<Vec<SavedRemedyRow>, StoreError> {
        Ok(self
            .saved
            .lock()
            .expect("saved mutex poisoned")
            .iter()
            .rev()
            .filter(|s| s.entry.user_id == user_id)
            .map(|s| SavedRemedyRow {
                id: s.id.clone(),
                remedy_id: s.entry.remedy_id.clone(),
                remedy_name: s.entry.remedy_name.clone(),
                notes: s.entry.notes.clone(),
                saved_at: Some(s.saved_at.clone()),
                remedies: self.catalog.iter().find(|r| r.id == s.entry.remedy_id).cloned(),
            })
            .collect())
    }

    async fn unsave_remedy(&self, user_id: &str, remedy_id: &str) -> Result<(), StoreError> {
        self.saved
            .lock()
            .expect("saved mutex poisoned")
            .retain(|s| !(s.entry.user_id == user_id && s.entry.remedy_id == remedy_id));
        Ok(())
    }

    async fn is_saved(&self, user_id: &str, remedy_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .saved
            .lock()
            .expect("saved mutex poisoned")
            .iter()
            .any(|s| s.entry.user_id == user_id && s.entry.remedy_id == remedy_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remedy::{AnswerSource, Language};

    fn remedy(id: &str, category: Option<&str>) -> Remedy {
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
            dosha: "Balances Vata".into(),
            dosha_hi: None,
            warning: "None".into(),
            warning_hi: None,
            explanation: "Works".into(),
            explanation_hi: None,
            symptoms: vec!["cough".into()],
            category: category.map(|c| c.to_string()),
        }
    }

    fn record(user: &str, symptom: &str) -> HistoryRecord {
        HistoryRecord {
            user_id: user.to_string(),
            symptom: symptom.to_string(),
            language: Language::En,
            remedy_id: Some("r-1".into()),
            remedy_name: "Remedy r-1".into(),
            source: AnswerSource::Dataset,
            matched_keywords: Some(vec![symptom.to_string()]),
            dosha_used: None,
            ranking_score: Some(50.0),
            ai_refinement_used: Some(false),
            response_time_ms: Some(1.5),
        }
    }

    #[tokio::test]
    async fn memory_list_filters_by_category() {
        let store = MemoryStore::with_catalog(vec![
            remedy("a", Some("respiratory")),
            remedy("b", Some("digestive")),
            remedy("c", None),
        ]);
        let all = store.list_remedies(None).await.unwrap();
        assert_eq!(all.len(), 3);
        let digestive = store.list_remedies(Some("digestive")).await.unwrap();
        assert_eq!(digestive.len(), 1);
        assert_eq!(digestive[0].id, "b");
    }

    #[tokio::test]
    async fn memory_profile_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.fetch_dosha_profile("u-1").await.unwrap().is_none());
        let update = ProfileUpdate {
            dosha_primary: Dosha::Pitta,
            dosha_secondary: Some(Dosha::Vata),
            dosha_assessment_date: "2026-01-01T00:00:00Z".into(),
            dosha_quiz_answers: vec![],
        };
        store.save_dosha_profile("u-1", &update).await.unwrap();
        let profile = store.fetch_dosha_profile("u-1").await.unwrap().unwrap();
        assert_eq!(profile.primary, Dosha::Pitta);
        assert_eq!(profile.secondary, Some(Dosha::Vata));
    }

    #[tokio::test]
    async fn memory_history_is_per_user_newest_first() {
        let store = MemoryStore::new();
        store.append_history(&record("u-1", "cough")).await.unwrap();
        store.append_history(&record("u-2", "fever")).await.unwrap();
        store.append_history(&record("u-1", "cold")).await.unwrap();

        let items = store.recent_history("u-1", 10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].symptom, "cold");
        assert_eq!(items[1].symptom, "cough");
        assert_eq!(items[0].match_score, Some(50.0));

        let capped = store.recent_history("u-1", 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].symptom, "cold");
    }

    #[tokio::test]
    async fn memory_saved_remedies_flow() {
        let store = MemoryStore::with_catalog(vec![remedy("r-1", None)]);
        let entry = SavedRemedy {
            user_id: "u-1".into(),
            remedy_id: "r-1".into(),
            remedy_name: "Remedy r-1".into(),
            notes: Some("worked well".into()),
        };

        match store.save_remedy(&entry).await.unwrap() {
            SaveOutcome::Saved(Some(id)) => assert!(id.starts_with("mem-")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(store.is_saved("u-1", "r-1").await.unwrap());
        assert_eq!(
            store.save_remedy(&entry).await.unwrap(),
            SaveOutcome::AlreadySaved
        );

        let rows = store.saved_remedies("u-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].remedy_id, "r-1");
        assert!(rows[0].remedies.is_some());

        store.unsave_remedy("u-1", "r-1").await.unwrap();
        assert!(!store.is_saved("u-1", "r-1").await.unwrap());
        assert!(store.saved_remedies("u-1").await.unwrap().is_empty());
    }
}
