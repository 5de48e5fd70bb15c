//! AYUSH Assistant — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ayush_assistant::api;
use ayush_assistant::bootstrap;
use ayush_assistant::config::{PipelineConfig, ServiceConfig};
use ayush_assistant::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ayush_assistant=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let service = ServiceConfig::from_env();
    let pipeline_cfg = PipelineConfig::load();

    // Recorder must be installed before the first counter is touched.
    let metrics = Metrics::init(pipeline_cfg.layer_count(service.anthropic_api_key.is_some()));

    let state = bootstrap::build_state(&service, pipeline_cfg);
    bootstrap::startup_probe(&state).await;

    let router = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(service.bind_addr).await?;
    tracing::info!(addr = %service.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
