use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth::{require_identity, resolve_identity, AuthError, SharedVerifier};
use crate::config::PipelineConfig;
use crate::dosha::{assess_quiz, DoshaAssessment, DoshaProfile, QuizAnswer};
use crate::pipeline::{Pipeline, QueryOutcome};
use crate::remedy::{HistoryItem, Language, SaveOutcome, SavedRemedy};
use crate::store::{ProfileUpdate, RemedyStore, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: SharedStore,
    pub verifier: SharedVerifier,
    pub ai_enabled: bool,
    pub database: &'static str,
    pub capabilities: PipelineConfig,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/ask", post(ask))
        .route("/api/dosha/assess", post(assess_dosha))
        .route("/api/dosha/profile", get(dosha_profile))
        .route("/api/history", get(history))
        .route("/api/remedies", get(list_remedies))
        .route("/api/remedies/save", post(save_remedy))
        .route("/api/remedies/saved", get(saved_remedies))
        .route("/api/remedies/saved/{remedy_id}", delete(unsave_remedy))
        .route("/api/remedies/is-saved/{remedy_id}", get(is_saved))
        .layer(middleware::from_fn(track_process_time))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Client-facing failures. Every variant renders as `{"detail": <message>}`
/// so the error body shape is uniform across endpoints.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::Unauthorized(d) => (StatusCode::UNAUTHORIZED, d),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Internal(d) => (StatusCode::INTERNAL_SERVER_ERROR, d),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        // Verifier transport trouble must not leak backend detail; the
        // client sees the same message as a rejected token.
        if let AuthError::Transport(inner) = &err {
            tracing::warn!(error = %inner, "token verification transport failure");
            return ApiError::Unauthorized(AuthError::Invalid.to_string());
        }
        ApiError::Unauthorized(err.to_string())
    }
}

async fn track_process_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.2}ms")) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-process-time"), value);
    }
    response
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let caps = &state.capabilities;
    Json(json!({
        "service": "AYUSH Digital Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "features": {
            "database": state.database,
            "ai_fallback": on_off(state.ai_enabled),
            "languages": ["en", "hi"],
            "intelligence_layers": caps.layer_count(state.ai_enabled),
            "dosha_assessment": on_off(caps.dosha_adjustment),
            "emergency_detection": on_off(caps.emergency_detection),
            "ranked_matching": on_off(caps.ranked_matching)
        }
    }))
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let (database, remedies_count) = match state.store.fetch_all_remedies().await {
        Ok(rows) if rows.is_empty() => ("empty".to_string(), 0),
        Ok(rows) => ("connected".to_string(), rows.len()),
        Err(err) => (format!("error: {err}"), 0),
    };
    Json(json!({
        "status": "healthy",
        "database": database,
        "ai_service": on_off(state.ai_enabled),
        "remedies_count": remedies_count,
        "supported_languages": ["en", "hi"]
    }))
}

#[derive(serde::Deserialize)]
struct AskRequest {
    symptom: String,
    #[serde(default)]
    language: Language,
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AskRequest>,
) -> Result<Json<QueryOutcome>, ApiError> {
    if body.symptom.trim().chars().count() < 2 {
        return Err(ApiError::BadRequest(
            "Please provide a valid symptom description (min 2 characters)".to_string(),
        ));
    }
    // Anonymous queries are allowed; a present-but-bad bearer token is not.
    let user_id = resolve_identity(&headers, state.verifier.as_ref()).await?;
    let outcome = state
        .pipeline
        .answer(&body.symptom, body.language, user_id.as_deref())
        .await;
    Ok(Json(outcome))
}

#[derive(serde::Deserialize)]
struct DoshaQuizRequest {
    answers: Vec<QuizAnswer>,
}

async fn assess_dosha(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DoshaQuizRequest>,
) -> Result<Json<DoshaAssessment>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    let Some(assessment) = assess_quiz(&body.answers) else {
        return Err(ApiError::BadRequest(
            "Please provide at least one quiz answer".to_string(),
        ));
    };
    // Persisting the profile is best effort; the quiz result is returned
    // even when the write fails.
    let update = ProfileUpdate {
        dosha_primary: assessment.primary,
        dosha_secondary: assessment.secondary,
        dosha_assessment_date: Utc::now().to_rfc3339(),
        dosha_quiz_answers: body.answers.clone(),
    };
    match state.store.save_dosha_profile(&user_id, &update).await {
        Ok(()) => tracing::info!(primary = %assessment.primary, "dosha assessment saved"),
        Err(err) => tracing::warn!(error = %err, "failed to persist dosha assessment"),
    }
    Ok(Json(assessment))
}

async fn dosha_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DoshaProfile>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    let profile = match state.store.fetch_dosha_profile(&user_id).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(error = %err, "dosha profile fetch failed");
            None
        }
    };
    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(ApiError::NotFound(
            "No dosha assessment found. Please take the quiz first.".to_string(),
        )),
    }
}

fn default_history_limit() -> usize {
    20
}

#[derive(serde::Deserialize)]
struct HistoryParams {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    let items = state
        .store
        .recent_history(&user_id, params.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "history retrieval error");
            ApiError::Internal("Failed to retrieve history".to_string())
        })?;
    Ok(Json(items))
}

#[derive(serde::Deserialize)]
struct RemediesParams {
    category: Option<String>,
    #[serde(default)]
    language: Language,
}

async fn list_remedies(
    State(state): State<AppState>,
    Query(params): Query<RemediesParams>,
) -> Result<Json<Value>, ApiError> {
    let rows = state
        .store
        .list_remedies(params.category.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "remedies list error");
            ApiError::Internal("Failed to retrieve remedies".to_string())
        })?;
    let remedies: Vec<Value> = rows
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "name": r.name_in(params.language),
                "category": r.category,
                "herb": r.herb_in(params.language),
                "dosha": r.dosha_in(params.language)
            })
        })
        .collect();
    Ok(Json(json!({ "remedies": remedies, "count": remedies.len() })))
}

#[derive(serde::Deserialize)]
struct SaveRemedyRequest {
    remedy_id: String,
    remedy_name: String,
    #[serde(default)]
    notes: Option<String>,
}

async fn save_remedy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SaveRemedyRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    let entry = SavedRemedy {
        user_id,
        remedy_id: body.remedy_id,
        remedy_name: body.remedy_name,
        notes: body.notes,
    };
    match state.store.save_remedy(&entry).await {
        Ok(SaveOutcome::AlreadySaved) => Ok(Json(json!({
            "success": false,
            "message": "Remedy already saved",
            "already_saved": true
        }))),
        Ok(SaveOutcome::Saved(saved_id)) => {
            tracing::info!(remedy = %entry.remedy_id, "remedy saved");
            Ok(Json(json!({
                "success": true,
                "message": "Remedy saved successfully",
                "saved_id": saved_id
            })))
        }
        Err(err) => {
            tracing::error!(error = %err, "save remedy error");
            Err(ApiError::Internal("Failed to save remedy".to_string()))
        }
    }
}

async fn saved_remedies(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    let rows = state.store.saved_remedies(&user_id).await.map_err(|err| {
        tracing::error!(error = %err, "get saved remedies error");
        ApiError::Internal("Failed to retrieve saved remedies".to_string())
    })?;
    Ok(Json(json!({
        "success": true,
        "count": rows.len(),
        "remedies": rows
    })))
}

async fn unsave_remedy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(remedy_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    state
        .store
        .unsave_remedy(&user_id, &remedy_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "unsave remedy error");
            ApiError::Internal("Failed to remove remedy".to_string())
        })?;
    tracing::info!(remedy = %remedy_id, "remedy unsaved");
    Ok(Json(json!({
        "success": true,
        "message": "Remedy removed from saved collection"
    })))
}

async fn is_saved(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(remedy_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_identity(&headers, state.verifier.as_ref()).await?;
    // Storage trouble reads as "not saved" rather than an error.
    let saved = match state.store.is_saved(&user_id, &remedy_id).await {
        Ok(flag) => flag,
        Err(err) => {
            tracing::warn!(error = %err, "check saved error");
            false
        }
    };
    Ok(Json(json!({ "is_saved": saved })))
}
