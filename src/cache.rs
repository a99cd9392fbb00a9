// src/cache.rs
//! In-process feed cache keyed by category (`feed-all`, `feed-uk`, ...).
//!
//! Entries expire on absolute age: valid while `now - timestamp < ttl`,
//! never refreshed on read. Expired entries are evicted lazily on `get`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clock::Clock;
use crate::ingest::types::{Article, SourceStatus};

/// One cached aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub articles: Vec<Article>,
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<SourceStatus>,
}

/// Injected cache seam; the service only ever talks to this.
pub trait FeedCache: Send + Sync {
    /// Live entry for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Arc<CacheEntry>>;
    /// Store (or replace) the entry for `key`, stamped with the current time.
    fn set(&self, key: &str, articles: Vec<Article>, sources: Vec<SourceStatus>) -> Arc<CacheEntry>;
    fn clear(&self);
    /// Age of the live entry for `key`.
    fn age(&self, key: &str) -> Option<chrono::Duration>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemoryFeedCache {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl MemoryFeedCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.timestamp < self.ttl
    }
}

impl FeedCache for MemoryFeedCache {
    fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let now = self.clock.now();
        {
            let map = self.entries.read().unwrap_or_else(|p| p.into_inner());
            match map.get(key) {
                None => return None,
                Some(e) if self.is_fresh(e, now) => return Some(Arc::clone(e)),
                Some(_) => {}
            }
        }
        let mut map = self.entries.write().unwrap_or_else(|p| p.into_inner());
        // re-check: a writer may have refreshed the key in between
        if let Some(e) = map.get(key) {
            if self.is_fresh(e, now) {
                return Some(Arc::clone(e));
            }
            map.remove(key);
            tracing::debug!(target: "cache", key, "evicted expired entry");
        }
        None
    }

    fn set(&self, key: &str, articles: Vec<Article>, sources: Vec<SourceStatus>) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            articles,
            timestamp: self.clock.now(),
            sources,
        });
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), Arc::clone(&entry));
        entry
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    fn age(&self, key: &str) -> Option<chrono::Duration> {
        self.get(key).map(|e| self.clock.now() - e.timestamp)
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}
