// src/ingest/mod.rs
pub mod normalize;
pub mod parser;
pub mod transport;
pub mod types;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::normalize::{
    article_id, extract_image_url, full_description, parse_date, short_description,
};
use crate::ingest::types::{Article, ArticleSource, FeedTransport, RawItem};
use crate::registry::FeedSource;

pub use crate::ingest::normalize::{clean_html, decode_entities};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Raw items parsed from upstream feeds.");
        describe_counter!(
            "feed_items_skipped_total",
            "Items dropped for a missing title or link."
        );
        describe_counter!("feed_articles_total", "Articles produced after normalisation.");
        describe_counter!(
            "feed_source_errors_total",
            "Per-source fetch/parse failures (timeouts included)."
        );
        describe_histogram!("feed_parse_ms", "Feed parse + normalise time in milliseconds.");
        describe_histogram!("feed_aggregate_ms", "Full aggregation cycle time in milliseconds.");
        describe_counter!("feed_cache_hits_total", "Feed requests served from cache.");
        describe_counter!("feed_cache_misses_total", "Feed requests that ran an aggregation cycle.");
        describe_gauge!("feed_cache_ttl_ms", "Configured feed cache TTL in milliseconds.");
    });
}

/// Turn parsed items into articles for `source`.
///
/// Items without a title or link are skipped; at most `limit` articles are
/// kept. `fetched_at` stands in for a missing or unparseable publish date.
pub fn normalise_items(
    source: &FeedSource,
    items: Vec<RawItem>,
    limit: usize,
    fetched_at: DateTime<Utc>,
) -> Vec<Article> {
    let total = items.len();
    let mut out = Vec::with_capacity(total.min(limit));

    for it in items {
        if out.len() >= limit {
            break;
        }
        let title = it.title.as_deref().map(str::trim).unwrap_or_default();
        let url = it.link.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            counter!("feed_items_skipped_total").increment(1);
            continue;
        }

        // content:encoded only feeds the lead image
        let rich = it.content.as_deref();
        let plain = it.summary.as_deref().or(rich);
        let full = full_description(rich, plain);
        let description = short_description(&full);

        out.push(Article {
            id: article_id(&source.id, url),
            title: decode_entities(title).trim().to_string(),
            description,
            full_description: full,
            url: url.to_string(),
            image_url: extract_image_url(&it),
            source: ArticleSource {
                id: source.id.clone(),
                name: source.name.clone(),
            },
            category: source.category,
            published_at: it
                .published
                .as_deref()
                .and_then(parse_date)
                .unwrap_or(fetched_at),
            author: it
                .author
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        });
    }

    counter!("feed_items_total").increment(total as u64);
    counter!("feed_articles_total").increment(out.len() as u64);
    out
}

/// Parse one feed document for `source`.
pub fn parse_source_document(
    source: &FeedSource,
    body: &str,
    limit: usize,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let items = parser::parse_feed(body).with_context(|| format!("parsing feed {}", source.id))?;
    let articles = normalise_items(source, items, limit, fetched_at);
    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(articles)
}

/// Fetch and normalise one source. Any error means "this source failed";
/// the caller decides what that does to the batch.
pub async fn fetch_and_normalise(
    source: &FeedSource,
    transport: &dyn FeedTransport,
    limit: usize,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Article>> {
    ensure_metrics_described();
    let body = transport
        .fetch(&source.url)
        .await
        .with_context(|| format!("fetching feed {} via {}", source.id, transport.name()))?;
    parse_source_document(source, &body, limit, fetched_at)
}
