//! # Multi-source aggregation
//!
//! Fans one cycle out to every source concurrently, waits for every
//! outcome (settle-all, never fail-fast), then orders the pooled articles:
//!
//! 1. newest first by `published_at` (stable sort),
//! 2. grouped per source in order of first appearance,
//! 3. interleaved round-robin until every group is drained.
//!
//! Statuses keep the order of the input sources, so the result does not
//! depend on which fetch finished first.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::{
    self,
    types::{Article, FeedTransport, FetchStatus, SourceStatus},
};
use crate::registry::FeedSource;

/// Result of one aggregation cycle; always well-formed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub articles: Vec<Article>,
    pub source_statuses: Vec<SourceStatus>,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub items_per_source: usize,
    pub fetch_timeout: Duration,
}

/// Fetch every source concurrently and merge the survivors.
pub async fn aggregate(
    sources: &[FeedSource],
    transport: Arc<dyn FeedTransport>,
    opts: AggregateOptions,
    fetched_at: DateTime<Utc>,
) -> Aggregated {
    ingest::ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                let fut = ingest::fetch_and_normalise(
                    &source,
                    transport.as_ref(),
                    opts.items_per_source,
                    fetched_at,
                );
                match tokio::time::timeout(opts.fetch_timeout, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow::anyhow!(
                        "fetch of {} timed out after {:?}",
                        source.id,
                        opts.fetch_timeout
                    )),
                }
            })
        })
        .collect();

    let mut pool = Vec::new();
    let mut statuses = Vec::with_capacity(sources.len());

    for (source, handle) in sources.iter().zip(handles) {
        let outcome = match handle.await {
            Ok(res) => res,
            Err(join_err) => Err(anyhow::anyhow!("fetch task for {} aborted: {join_err}", source.id)),
        };
        match outcome {
            Ok(mut articles) => {
                statuses.push(SourceStatus::ok(&source.id, &source.name, articles.len()));
                pool.append(&mut articles);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.id, "feed source failed");
                counter!("feed_source_errors_total").increment(1);
                statuses.push(SourceStatus::error(&source.id, &source.name));
            }
        }
    }

    let articles = order_articles(pool);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_aggregate_ms").record(ms);
    tracing::info!(
        target: "aggregate",
        sources = sources.len(),
        errors = statuses.iter().filter(|s| s.status == FetchStatus::Error).count(),
        articles = articles.len(),
        elapsed_ms = ms as u64,
        "aggregation cycle finished"
    );

    Aggregated {
        articles,
        source_statuses: statuses,
    }
}

/// Recency sort followed by round-robin interleave across sources.
pub fn order_articles(mut articles: Vec<Article>) -> Vec<Article> {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    interleave_by_source(articles)
}

/// Round-robin merge of per-source queues. Groups are visited in order of
/// each source's first appearance in `articles`; within a group the input
/// order is kept.
pub fn interleave_by_source(articles: Vec<Article>) -> Vec<Article> {
    let total = articles.len();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, VecDeque<Article>> = HashMap::new();

    for a in articles {
        let key = a.source.id.clone();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                VecDeque::new()
            })
            .push_back(a);
    }

    let mut queues: Vec<VecDeque<Article>> = order
        .into_iter()
        .filter_map(|k| groups.remove(&k))
        .collect();

    let mut out = Vec::with_capacity(total);
    while out.len() < total {
        for q in queues.iter_mut() {
            if let Some(a) = q.pop_front() {
                out.push(a);
            }
        }
    }
    out
}
