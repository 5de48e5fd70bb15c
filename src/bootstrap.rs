use std::sync::Arc;

use tracing::{info, warn};

use crate::ai::{build_provider, SharedProvider};
use crate::api::AppState;
use crate::auth::{DisabledVerifier, SharedVerifier, SupabaseVerifier};
use crate::config::{PipelineConfig, ServiceConfig};
use crate::pipeline::Pipeline;
use crate::store::{MemoryStore, RemedyStore, SharedStore, SupabaseStore};

/// Wire the collaborators named in the environment into one app state.
/// A missing backing service degrades to an in-process stand-in so the
/// API stays serveable.
pub fn build_state(service: &ServiceConfig, pipeline_cfg: PipelineConfig) -> AppState {
    let (store, verifier, database): (SharedStore, SharedVerifier, &'static str) =
        match (&service.supabase_url, &service.supabase_service_key) {
            (Some(url), Some(key)) => {
                info!("storage: supabase configured");
                (
                    Arc::new(SupabaseStore::new(url.clone(), key.clone())),
                    Arc::new(SupabaseVerifier::new(url.clone(), key.clone())),
                    "connected",
                )
            }
            _ => {
                warn!("SUPABASE_URL/SUPABASE_SERVICE_KEY not set, using in-memory store");
                (
                    Arc::new(MemoryStore::new()),
                    Arc::new(DisabledVerifier),
                    "in-memory",
                )
            }
        };

    let ai_enabled = service.anthropic_api_key.is_some();
    // Safe diagnostics: enabled + model + key length, never the key itself
    info!(
        "AI provider: enabled={}, model={}, key_len={}",
        ai_enabled,
        service.anthropic_model,
        service
            .anthropic_api_key
            .as_deref()
            .map(str::len)
            .unwrap_or(0)
    );
    let ai: SharedProvider =
        build_provider(service.anthropic_api_key.as_deref(), &service.anthropic_model);

    info!(
        layers = pipeline_cfg.layer_count(ai_enabled),
        emergency = pipeline_cfg.emergency_detection,
        ranked = pipeline_cfg.ranked_matching,
        dosha = pipeline_cfg.dosha_adjustment,
        enrichment = pipeline_cfg.history_enrichment,
        "pipeline configured"
    );

    let pipeline = Arc::new(Pipeline::new(store.clone(), ai, pipeline_cfg.clone()));
    AppState {
        pipeline,
        store,
        verifier,
        ai_enabled,
        database,
        capabilities: pipeline_cfg,
    }
}

/// Log catalog reachability at startup without failing the boot.
pub async fn startup_probe(state: &AppState) {
    match state.store.fetch_all_remedies().await {
        Ok(rows) => info!(remedies = rows.len(), "storage probe ok"),
        Err(err) => warn!(error = %err, "storage probe failed, queries will degrade"),
    }
}
