//! newsdesk — binary entrypoint.
//! Boots the Axum HTTP server: config, shared feed service, routes, metrics.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk::api::{self, AppState};
use newsdesk::cache::MemoryFeedCache;
use newsdesk::clock::SystemClock;
use newsdesk::config::PipelineConfig;
use newsdesk::hero::HeroSelector;
use newsdesk::ingest::transport::HttpTransport;
use newsdesk::metrics::Metrics;
use newsdesk::registry::SourceRegistry;
use newsdesk::service::FeedService;

/// Compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NEWSDESK_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWSDESK_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info,warn"));

    // the runtime may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env in local/dev; no-op in prod
    let _ = dotenvy::dotenv();
    enable_dev_tracing();

    let cfg = PipelineConfig::from_env();
    let metrics = Metrics::init(&cfg)?;

    let transport = HttpTransport::new(&cfg.user_agent, cfg.fetch_timeout)
        .context("building HTTP feed transport")?;
    let clock = Arc::new(SystemClock);
    let cache = MemoryFeedCache::new(cfg.cache_ttl, clock.clone());
    let registry = SourceRegistry::load_default();
    let hero = HeroSelector::load_default(cfg.hero_candidates);

    tracing::info!(
        sources = registry.all().len(),
        ttl_ms = cfg.cache_ttl.as_millis() as u64,
        "newsdesk starting"
    );

    let service = FeedService::new(
        Arc::new(registry),
        Arc::new(transport),
        Arc::new(cache),
        clock,
        cfg,
    )
    .with_hero(hero);

    let state = AppState {
        service: Arc::new(service),
    };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
