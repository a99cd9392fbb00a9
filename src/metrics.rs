//! Prometheus export for the feed pipeline.
//!
//! Counters and histograms are emitted where the work happens (`ingest`,
//! `aggregate`, `service`); this module installs the recorder, publishes the
//! pipeline settings as gauges and serves the scrape endpoint.
//!
//! Series: `feed_cache_{hits,misses}_total`, `feed_source_errors_total`,
//! `feed_items_total`, `feed_items_skipped_total`, `feed_articles_total`,
//! `feed_parse_ms`, `feed_aggregate_ms`, plus the gauges below.

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::PipelineConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder and publish the pipeline settings.
    pub fn init(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder for feed metrics")?;

        crate::ingest::ensure_metrics_described();
        publish_pipeline_gauges(cfg);

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render_metrics))
            .with_state(self.handle.clone())
    }
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Static gauges describing how the feed cycle is configured.
pub fn publish_pipeline_gauges(cfg: &PipelineConfig) {
    describe_gauge!(
        "feed_items_per_source",
        "Articles kept per source in one aggregation cycle."
    );
    describe_gauge!(
        "feed_fetch_timeout_ms",
        "Per-source upstream fetch timeout in milliseconds."
    );

    // absolute TTL, reads never extend it
    gauge!("feed_cache_ttl_ms").set(cfg.cache_ttl.as_millis() as f64);
    gauge!("feed_items_per_source").set(cfg.items_per_source as f64);
    gauge!("feed_fetch_timeout_ms").set(cfg.fetch_timeout.as_millis() as f64);
}
