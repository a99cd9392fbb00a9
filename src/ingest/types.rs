// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Category;

/// One normalised story derived from a single feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,       // short, for compact cards
    pub full_description: String,  // up to a few paragraphs
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub source: ArticleSource,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    Error,
}

/// Per-cycle health record for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub status: FetchStatus,
    pub article_count: usize,
}

impl SourceStatus {
    pub fn ok(id: &str, name: &str, article_count: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: FetchStatus::Ok,
            article_count,
        }
    }

    pub fn error(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: FetchStatus::Error,
            article_count: 0,
        }
    }
}

/// Raw fields of one upstream item, as read from RSS 2.0, RSS 1.0 or Atom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    /// RSS `description` / Atom `content`.
    pub content: Option<String>,
    pub content_encoded: Option<String>,
    /// Atom `summary`.
    pub summary: Option<String>,
    pub author: Option<String>,
    pub media_content: Vec<String>,
    pub media_thumbnail: Vec<String>,
    pub enclosures: Vec<String>,
}

/// Fetches the raw feed document behind a URL.
#[async_trait::async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}
