// src/service.rs
//! Request pipeline behind `/feeds`:
//! cache lookup → registry → aggregate → hero → cache store.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::aggregate::{self, AggregateOptions};
use crate::cache::{CacheEntry, FeedCache};
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::hero::{self, HeroScore, HeroSelector};
use crate::ingest::types::FeedTransport;
use crate::registry::{CategoryFilter, SourceRegistry};

/// What one `/feeds` request gets back.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub entry: Arc<CacheEntry>,
    pub cache_hit: bool,
}

impl FeedSnapshot {
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.entry.timestamp
    }
}

/// Hero breakdown row for `/debug/hero`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroCandidate {
    pub position: usize,
    pub id: String,
    pub title: String,
    pub source_id: String,
    pub score: HeroScore,
}

pub struct FeedService {
    registry: Arc<SourceRegistry>,
    transport: Arc<dyn FeedTransport>,
    cache: Arc<dyn FeedCache>,
    clock: Arc<dyn Clock>,
    hero: RwLock<Arc<HeroSelector>>,
    hero_config_path: PathBuf,
    cfg: PipelineConfig,
}

impl FeedService {
    /// Service with the built-in hero lexicon; see [`FeedService::with_hero`].
    pub fn new(
        registry: Arc<SourceRegistry>,
        transport: Arc<dyn FeedTransport>,
        cache: Arc<dyn FeedCache>,
        clock: Arc<dyn Clock>,
        cfg: PipelineConfig,
    ) -> Self {
        let hero = HeroSelector::with_defaults(cfg.hero_candidates);
        Self {
            registry,
            transport,
            cache,
            clock,
            hero: RwLock::new(Arc::new(hero)),
            hero_config_path: hero::hero_config_path(),
            cfg,
        }
    }

    pub fn with_hero(self, selector: HeroSelector) -> Self {
        *self.hero.write().unwrap_or_else(|p| p.into_inner()) = Arc::new(selector);
        self
    }

    pub fn with_hero_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hero_config_path = path.into();
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn hero(&self) -> Arc<HeroSelector> {
        Arc::clone(&self.hero.read().unwrap_or_else(|p| p.into_inner()))
    }

    /// Aggregated feed for `filter`, served from cache while fresh.
    pub async fn feed(&self, filter: CategoryFilter) -> FeedSnapshot {
        let key = filter.cache_key();

        if let Some(entry) = self.cache.get(&key) {
            counter!("feed_cache_hits_total").increment(1);
            tracing::debug!(target: "service", category = filter.as_str(), "cache hit");
            return FeedSnapshot {
                entry,
                cache_hit: true,
            };
        }
        counter!("feed_cache_misses_total").increment(1);

        let sources = self.registry.sources_for(&filter);
        let opts = AggregateOptions {
            items_per_source: self.cfg.items_per_source,
            fetch_timeout: self.cfg.fetch_timeout,
        };
        let agg = aggregate::aggregate(
            &sources,
            Arc::clone(&self.transport),
            opts,
            self.clock.now(),
        )
        .await;

        let articles = self
            .hero()
            .select(agg.articles, &self.registry, self.clock.now());

        tracing::info!(
            target: "service",
            category = filter.as_str(),
            sources = sources.len(),
            articles = articles.len(),
            "feed rebuilt"
        );

        let entry = self.cache.set(&key, articles, agg.source_statuses);
        FeedSnapshot {
            entry,
            cache_hit: false,
        }
    }

    /// Score breakdown of the hero candidates in the cached list for
    /// `filter`. Empty when nothing is cached; never triggers a fetch.
    pub fn hero_breakdown(&self, filter: &CategoryFilter) -> Vec<HeroCandidate> {
        let Some(entry) = self.cache.get(&filter.cache_key()) else {
            return Vec::new();
        };
        let hero = self.hero();
        let now = self.clock.now();
        entry
            .articles
            .iter()
            .take(hero.candidates())
            .enumerate()
            .map(|(position, a)| HeroCandidate {
                position,
                id: a.id.clone(),
                title: a.title.clone(),
                source_id: a.source.id.clone(),
                score: hero.score(a, &self.registry, now),
            })
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!(target: "service", "feed cache cleared");
    }

    /// Re-read the hero config file; falls back to defaults when it is
    /// missing or broken. Cached lists keep their current order.
    pub fn reload_hero(&self) -> Arc<HeroSelector> {
        let fresh = Arc::new(HeroSelector::load_from_file(
            &self.hero_config_path,
            self.cfg.hero_candidates,
        ));
        *self.hero.write().unwrap_or_else(|p| p.into_inner()) = Arc::clone(&fresh);
        tracing::info!(target: "service", path = %self.hero_config_path.display(), "hero config reloaded");
        fresh
    }
}
