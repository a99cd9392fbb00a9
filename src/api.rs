use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::ingest::types::{Article, SourceStatus};
use crate::registry::{CategoryFilter, FeedSource};
use crate::service::{FeedService, HeroCandidate};

/// Diagnostics header on `/feeds`: `HIT` or `MISS`.
pub const CACHE_HEADER: &str = "X-Feed-Cache";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FeedService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feeds", get(get_feeds))
        .route("/sources", get(get_sources))
        .route("/debug/hero", get(debug_hero))
        .route("/admin/cache/clear", post(admin_clear_cache))
        .route("/admin/reload-hero", post(admin_reload_hero))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct FeedQuery {
    #[serde(default)]
    category: Option<String>,
    // kept as text so a bad value falls back instead of rejecting
    #[serde(default)]
    limit: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse<'a> {
    articles: &'a [Article],
    last_updated: DateTime<Utc>,
    sources: &'a [SourceStatus],
}

async fn get_feeds(State(state): State<AppState>, Query(q): Query<FeedQuery>) -> Response {
    let filter = CategoryFilter::from_request(q.category.as_deref());
    if let CategoryFilter::Unknown(name) = &filter {
        tracing::debug!(target: "api", category = %name, "no sources for category");
    }
    let limit = effective_limit(q.limit.as_deref(), state.service.config().max_limit);

    let snap = state.service.feed(filter).await;
    let articles = &snap.entry.articles;

    let mut resp = Json(FeedResponse {
        articles: &articles[..limit.min(articles.len())],
        last_updated: snap.last_updated(),
        sources: &snap.entry.sources,
    })
    .into_response();

    let signal = if snap.cache_hit { "HIT" } else { "MISS" };
    resp.headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static(signal));
    resp
}

#[derive(Debug, Default, Deserialize)]
struct CategoryQuery {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Serialize)]
struct SourceOut<'a> {
    #[serde(flatten)]
    source: &'a FeedSource,
    priority: f64,
}

async fn get_sources(State(state): State<AppState>, Query(q): Query<CategoryQuery>) -> Response {
    let filter = CategoryFilter::from_request(q.category.as_deref());
    let registry = state.service.registry();
    let sources = registry.sources_for(&filter);
    let out: Vec<SourceOut<'_>> = sources
        .iter()
        .map(|s| SourceOut {
            source: s,
            priority: registry.priority_of(&s.id),
        })
        .collect();
    Json(out).into_response()
}

#[derive(Serialize)]
struct HeroDebug {
    category: String,
    candidates: Vec<HeroCandidate>,
}

async fn debug_hero(State(state): State<AppState>, Query(q): Query<CategoryQuery>) -> Response {
    let filter = CategoryFilter::from_request(q.category.as_deref());
    Json(HeroDebug {
        category: filter.as_str().to_string(),
        candidates: state.service.hero_breakdown(&filter),
    })
    .into_response()
}

async fn admin_clear_cache(State(state): State<AppState>) -> &'static str {
    state.service.clear_cache();
    "cleared"
}

async fn admin_reload_hero(State(state): State<AppState>) -> String {
    let hero = state.service.reload_hero();
    format!("reloaded (candidates={})", hero.candidates())
}

/// `?limit=` capped at `max`; missing or non-numeric means `max`.
pub fn effective_limit(raw: Option<&str>, max: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map_or(max, |n| n.min(max))
}
