//! Runtime configuration: environment-backed service settings plus the
//! TOML-backed capability toggles that shape the query pipeline.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::dosha::DEFAULT_DOSHA_BOOST;
use crate::matching::DEFAULT_MAX_RESULTS;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

const PIPELINE_CONFIG_ENV: &str = "PIPELINE_CONFIG_PATH";
const PIPELINE_CONFIG_DEFAULT: &str = "config/pipeline.toml";

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Service-level settings resolved from the environment. Absent Supabase or
/// Anthropic keys are not errors; the collaborators degrade instead.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            supabase_url: non_empty_env("SUPABASE_URL"),
            supabase_service_key: non_empty_env("SUPABASE_SERVICE_KEY"),
            anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
            anthropic_model: non_empty_env("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        }
    }

    pub fn supabase_configured(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_key.is_some()
    }
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_dosha_boost() -> f64 {
    DEFAULT_DOSHA_BOOST
}

/// Capability toggles for the one query pipeline. Everything defaults to on;
/// a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub emergency_detection: bool,
    #[serde(default = "default_true")]
    pub ranked_matching: bool,
    #[serde(default = "default_true")]
    pub dosha_adjustment: bool,
    #[serde(default = "default_true")]
    pub history_enrichment: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_dosha_boost")]
    pub dosha_boost: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            emergency_detection: true,
            ranked_matching: true,
            dosha_adjustment: true,
            history_enrichment: true,
            max_results: DEFAULT_MAX_RESULTS,
            dosha_boost: DEFAULT_DOSHA_BOOST,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        Ok(cfg.clamped())
    }

    /// Keep the knobs in sane ranges rather than failing startup.
    fn clamped(mut self) -> Self {
        if self.max_results == 0 {
            self.max_results = DEFAULT_MAX_RESULTS;
        }
        if !self.dosha_boost.is_finite() || self.dosha_boost <= 0.0 {
            self.dosha_boost = DEFAULT_DOSHA_BOOST;
        }
        self
    }

    /// Load from `PIPELINE_CONFIG_PATH` (or `config/pipeline.toml`). Missing
    /// file means all capabilities on; an unreadable file logs and defaults.
    pub fn load() -> Self {
        let path = std::env::var(PIPELINE_CONFIG_ENV)
            .unwrap_or_else(|_| PIPELINE_CONFIG_DEFAULT.to_string());
        match std::fs::read_to_string(&path) {
            Ok(raw) => match Self::from_toml_str(&raw) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "pipeline config loaded");
                    cfg
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "invalid pipeline config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(path = %path, "no pipeline config file, using defaults");
                Self::default()
            }
        }
    }

    /// Active intelligence layers, for the service descriptor. Normalization
    /// and matching always run.
    pub fn layer_count(&self, ai_enabled: bool) -> u32 {
        let mut layers = 2;
        if self.emergency_detection {
            layers += 1;
        }
        if self.dosha_adjustment {
            layers += 1;
        }
        if self.history_enrichment {
            layers += 1;
        }
        if ai_enabled {
            layers += 1;
        }
        layers
    }
}
