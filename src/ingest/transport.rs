// src/ingest/transport.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::ingest::types::FeedTransport;

/// Plain HTTP(S) GET of a feed document.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            )
            .send()
            .await
            .with_context(|| format!("feed http get {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("feed http status {status} for {url}");
        }
        resp.text().await.context("feed http .text()")
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Serves canned documents by URL; unknown URLs fail like a dead host.
/// Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureTransport {
    docs: HashMap<String, String>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.docs.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl FeedTransport for FixtureTransport {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.docs.get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("no fixture for {url}"),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
