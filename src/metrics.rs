use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// One-time metrics registration (so series show up on /metrics).
fn describe_series() {
    describe_counter!("queries_total", "Symptom queries received.");
    describe_counter!(
        "emergency_detections_total",
        "Queries short-circuited by the emergency screen."
    );
    describe_counter!("ai_fallbacks_total", "Queries with no catalog match.");
    describe_counter!(
        "store_errors_total",
        "Storage calls that failed and degraded, by operation."
    );
    describe_counter!(
        "history_write_failures_total",
        "Best-effort history appends that failed."
    );
    describe_histogram!("query_pipeline_ms", "Query pipeline time in milliseconds.");
    describe_gauge!(
        "pipeline_intelligence_layers",
        "Active pipeline layers at startup."
    );
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and expose a static gauge with the
    /// number of active intelligence layers.
    pub fn init(intelligence_layers: u32) -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_series();
        gauge!("pipeline_intelligence_layers").set(intelligence_layers as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
