//! Hero article selection.
//!
//! Each candidate gets six sub-scores on their raw scale:
//! - `source_weight`         : registry priority of the article's source
//! - `breaking_score`        : breaking-news pattern hits × 10
//! - `major_event_score`     : major-event pattern hits × 5
//! - `important_topic_score` : institution/leader pattern hits × 5
//! - `has_image`             : 5 with a lead image, else 0
//! - `recency_score`         : age band, 10 (< 1h) down to 1 (≥ 24h)
//!
//! Total = Σ weight × sub-score. The best of the first `candidates`
//! articles moves to the front; ties keep the earlier article.
//!
//! Weights and the three pattern lists come from `config/hero.toml`
//! (each key optional) with built-in defaults.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::ingest::types::Article;
use crate::registry::SourceRegistry;

pub const DEFAULT_HERO_CONFIG_PATH: &str = "config/hero.toml";
pub const ENV_HERO_CONFIG_PATH: &str = "HERO_CONFIG_PATH";

const BREAKING_POINTS: f64 = 10.0;
const MAJOR_EVENT_POINTS: f64 = 5.0;
const TOPIC_POINTS: f64 = 5.0;
const IMAGE_POINTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroWeights {
    pub source: f64,
    pub breaking: f64,
    pub major_event: f64,
    pub important_topic: f64,
    pub image: f64,
    pub recency: f64,
}

impl Default for HeroWeights {
    fn default() -> Self {
        Self {
            source: 1.5,
            breaking: 3.0,
            major_event: 2.0,
            important_topic: 1.5,
            image: 0.5,
            recency: 1.0,
        }
    }
}

/// Pattern lists (regex syntax, matched case-insensitively).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroLexicon {
    pub breaking: Vec<String>,
    pub major_event: Vec<String>,
    pub important_topics: Vec<String>,
}

impl Default for HeroLexicon {
    fn default() -> Self {
        fn own(v: &[&str]) -> Vec<String> {
            v.iter().map(|s| s.to_string()).collect()
        }
        Self {
            breaking: own(&[
                r"\bbreaking\b",
                r"\bjust in\b",
                r"\burgent\b",
                r"\bexclusive\b",
                r"\blive\s*:",
                r"\bdeveloping\b",
                r"\bbreaks\s*:",
            ]),
            major_event: own(&[
                r"\bdies\b",
                r"\bdead\b",
                r"\bdeath\b",
                r"\bresigns\b",
                r"\bresignation\b",
                r"\bsacked\b",
                r"\bfired\b",
                r"\barrested\b",
                r"\bcrash\b",
                r"\battack\b",
                r"\bshooting\b",
                r"\bexplosion\b",
                r"\bearthquake\b",
                r"\bflood\b",
                r"\bwins\b",
                r"\bvictory\b",
                r"\belection\b",
                r"\bwar\b",
                r"\binvasion\b",
                r"\bcrisis\b",
            ]),
            important_topics: own(&[
                "prime minister",
                "keir starmer",
                "rishi sunak",
                "king charles",
                "royal family",
                "parliament",
                "downing street",
                "westminster",
                "cabinet",
                "chancellor",
                "home secretary",
                "foreign secretary",
                "nhs",
                "bank of england",
                "president biden",
                "president trump",
                "donald trump",
                "white house",
                "european union",
                "nato",
                "united nations",
                "supreme court",
                "climate summit",
                r"cop\d+",
            ]),
        }
    }
}

/// On-disk shape of `config/hero.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    pub weights: HeroWeights,
    pub lexicon: HeroLexicon,
}

impl HeroConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Sub-scores of one candidate plus the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroScore {
    pub source_weight: f64,
    pub breaking_score: f64,
    pub major_event_score: f64,
    pub important_topic_score: f64,
    pub has_image: f64,
    pub recency_score: f64,
    pub total: f64,
}

/// Compiled selector; cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct HeroSelector {
    weights: HeroWeights,
    breaking: Vec<Regex>,
    major_event: Vec<Regex>,
    important_topics: Vec<Regex>,
    candidates: usize,
}

impl HeroSelector {
    /// Compile a config. Patterns that fail to compile are skipped.
    pub fn new(cfg: HeroConfig, candidates: usize) -> Self {
        Self {
            weights: cfg.weights,
            breaking: compile_all("breaking", &cfg.lexicon.breaking),
            major_event: compile_all("major_event", &cfg.lexicon.major_event),
            important_topics: compile_all("important_topics", &cfg.lexicon.important_topics),
            candidates,
        }
    }

    pub fn with_defaults(candidates: usize) -> Self {
        Self::new(HeroConfig::default(), candidates)
    }

    /// Load from `$HERO_CONFIG_PATH`, else `config/hero.toml`, else defaults.
    pub fn load_default(candidates: usize) -> Self {
        Self::load_from_file(hero_config_path(), candidates)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, candidates: usize) -> Self {
        let path = path.as_ref();
        let cfg = match fs::read_to_string(path) {
            Ok(raw) => match HeroConfig::from_toml_str(&raw) {
                Ok(c) => {
                    tracing::info!(path = %path.display(), "loaded hero config");
                    c
                }
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "invalid hero config, using defaults");
                    HeroConfig::default()
                }
            },
            Err(_) => HeroConfig::default(),
        };
        Self::new(cfg, candidates)
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn weights(&self) -> &HeroWeights {
        &self.weights
    }

    pub fn score(&self, article: &Article, registry: &SourceRegistry, now: DateTime<Utc>) -> HeroScore {
        let text = format!("{} {}", article.title, article.description);

        let source_weight = registry.priority_of(&article.source.id);
        let breaking_score = match_count(&text, &self.breaking) as f64 * BREAKING_POINTS;
        let major_event_score = match_count(&text, &self.major_event) as f64 * MAJOR_EVENT_POINTS;
        let important_topic_score =
            match_count(&text, &self.important_topics) as f64 * TOPIC_POINTS;
        let has_image = if article.image_url.is_some() {
            IMAGE_POINTS
        } else {
            0.0
        };
        let recency_score = recency_score(article.published_at, now);

        let w = &self.weights;
        let total = source_weight * w.source
            + breaking_score * w.breaking
            + major_event_score * w.major_event
            + important_topic_score * w.important_topic
            + has_image * w.image
            + recency_score * w.recency;

        HeroScore {
            source_weight,
            breaking_score,
            major_event_score,
            important_topic_score,
            has_image,
            recency_score,
            total,
        }
    }

    /// Index of the winning candidate; `None` for an empty list.
    pub fn best_index(
        &self,
        articles: &[Article],
        registry: &SourceRegistry,
        now: DateTime<Utc>,
    ) -> Option<usize> {
        let window = articles.len().min(self.candidates.max(1));
        let mut best: Option<(usize, f64)> = None;
        for (i, a) in articles[..window].iter().enumerate() {
            let total = self.score(a, registry, now).total;
            // strict: earlier candidate keeps ties
            if best.map_or(true, |(_, b)| total > b) {
                best = Some((i, total));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Move the best candidate to index 0; everyone else keeps their order.
    ///
    /// The promotion stays inside the candidate window, so the window holds
    /// the same articles afterwards and a second pass changes nothing.
    pub fn select(
        &self,
        mut articles: Vec<Article>,
        registry: &SourceRegistry,
        now: DateTime<Utc>,
    ) -> Vec<Article> {
        if articles.len() <= 1 {
            return articles;
        }
        match self.best_index(&articles, registry, now) {
            Some(i) if i > 0 => {
                let hero = articles.remove(i);
                articles.insert(0, hero);
                tracing::debug!(target: "hero", id = %articles[0].id, from = i, "promoted hero");
                articles
            }
            _ => articles,
        }
    }
}

pub fn hero_config_path() -> std::path::PathBuf {
    std::env::var(ENV_HERO_CONFIG_PATH)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from(DEFAULT_HERO_CONFIG_PATH))
}

/// Freshness band by age in hours.
pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - published_at).num_milliseconds() as f64 / 3_600_000.0;
    if age_hours < 1.0 {
        10.0
    } else if age_hours < 2.0 {
        9.0
    } else if age_hours < 4.0 {
        8.0
    } else if age_hours < 6.0 {
        7.0
    } else if age_hours < 12.0 {
        5.0
    } else if age_hours < 24.0 {
        3.0
    } else {
        1.0
    }
}

fn match_count(text: &str, patterns: &[Regex]) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

fn compile_all(list: &str, patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){p}")) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(list, pattern = %p, error = %e, "skipping invalid hero pattern");
                None
            }
        })
        .collect()
}
