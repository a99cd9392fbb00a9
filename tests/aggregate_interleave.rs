// tests/aggregate_interleave.rs
//
// Settle-all fan-out over several sources with injected transports.
//
// Covered:
// - one failing source never sinks the batch; statuses keep source order
// - recency sort + round-robin interleave across sources
// - slow sources are cut off by the per-fetch timeout
// - a panicking fetch counts as that source failing

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use newsdesk::aggregate::{aggregate, AggregateOptions};
use newsdesk::ingest::transport::FixtureTransport;
use newsdesk::ingest::types::{FeedTransport, FetchStatus};
use newsdesk::registry::{Category, FeedSource};

fn rss(items: &[(&str, &str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link, date)| {
            format!(
                "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate>\
                 <description>{title} in brief.</description></item>"
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>{body}</channel></rss>"#)
}

fn source(id: &str) -> FeedSource {
    FeedSource::new(id, &id.to_uppercase(), &format!("https://{id}.test/rss"), Category::World)
}

fn opts() -> AggregateOptions {
    AggregateOptions {
        items_per_source: 10,
        fetch_timeout: Duration::from_secs(10),
    }
}

fn abc_transport() -> FixtureTransport {
    FixtureTransport::new()
        .with(
            "https://a.test/rss",
            &rss(&[
                ("A1", "https://a.test/1", "Tue, 10 Jun 2025 10:00:00 GMT"),
                ("A2", "https://a.test/2", "Tue, 10 Jun 2025 09:40:00 GMT"),
                ("A3", "https://a.test/3", "Tue, 10 Jun 2025 09:20:00 GMT"),
            ]),
        )
        // b has no fixture: fetch fails
        .with(
            "https://c.test/rss",
            &rss(&[
                ("C1", "https://c.test/1", "Tue, 10 Jun 2025 09:50:00 GMT"),
                ("C2", "https://c.test/2", "Tue, 10 Jun 2025 09:30:00 GMT"),
            ]),
        )
}

#[tokio::test]
async fn failing_source_is_isolated_and_output_interleaved() {
    let sources = vec![source("a"), source("b"), source("c")];
    let fetched_at = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

    let out = aggregate(&sources, Arc::new(abc_transport()), opts(), fetched_at).await;

    let statuses: Vec<_> = out
        .source_statuses
        .iter()
        .map(|s| (s.id.as_str(), s.status, s.article_count))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("a", FetchStatus::Ok, 3),
            ("b", FetchStatus::Error, 0),
            ("c", FetchStatus::Ok, 2),
        ]
    );

    let titles: Vec<_> = out.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["A1", "C1", "A2", "C2", "A3"]);
}

#[tokio::test]
async fn all_sources_failing_yields_empty_list() {
    let sources = vec![source("x"), source("y")];
    let out = aggregate(&sources, Arc::new(FixtureTransport::new()), opts(), Utc::now()).await;

    assert!(out.articles.is_empty());
    assert_eq!(out.source_statuses.len(), 2);
    assert!(out
        .source_statuses
        .iter()
        .all(|s| s.status == FetchStatus::Error && s.article_count == 0));
}

#[tokio::test]
async fn no_sources_is_an_empty_cycle() {
    let out = aggregate(&[], Arc::new(FixtureTransport::new()), opts(), Utc::now()).await;
    assert!(out.articles.is_empty());
    assert!(out.source_statuses.is_empty());
}

/// Answers instantly, except for one URL that never comes back in time.
struct SlowFor {
    slow_url: String,
    inner: FixtureTransport,
}

#[async_trait]
impl FeedTransport for SlowFor {
    async fn fetch(&self, url: &str) -> Result<String> {
        if url == self.slow_url {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.fetch(url).await
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_without_blocking_others() {
    let sources = vec![source("a"), source("c")];
    let transport = SlowFor {
        slow_url: "https://a.test/rss".into(),
        inner: abc_transport(),
    };
    let opts = AggregateOptions {
        items_per_source: 10,
        fetch_timeout: Duration::from_millis(200),
    };

    let out = aggregate(&sources, Arc::new(transport), opts, Utc::now()).await;

    assert_eq!(out.source_statuses[0].status, FetchStatus::Error);
    assert_eq!(out.source_statuses[1].status, FetchStatus::Ok);
    let titles: Vec<_> = out.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["C1", "C2"]);
}

struct Panicky;

#[async_trait]
impl FeedTransport for Panicky {
    async fn fetch(&self, url: &str) -> Result<String> {
        if url.contains("boom") {
            panic!("transport blew up");
        }
        bail!("offline")
    }

    fn name(&self) -> &'static str {
        "panicky"
    }
}

#[tokio::test]
async fn panicking_fetch_counts_as_failure() {
    let sources = vec![source("boom"), source("quiet")];
    let out = aggregate(&sources, Arc::new(Panicky), opts(), Utc::now()).await;

    assert_eq!(out.source_statuses.len(), 2);
    assert!(out
        .source_statuses
        .iter()
        .all(|s| s.status == FetchStatus::Error));
}
