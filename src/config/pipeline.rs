// src/config/pipeline.rs
//! Policy knobs of the ingestion pipeline. Defaults are the named
//! constants below; each can be overridden through the environment.

use std::time::Duration;

pub const ITEMS_PER_SOURCE: usize = 10;
pub const HERO_CANDIDATES: usize = 30;
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_LIMIT: usize = 300;
pub const DEFAULT_USER_AGENT: &str = "newsdesk/0.1 (+feed aggregator)";

pub const ENV_ITEMS_PER_SOURCE: &str = "FEED_ITEMS_PER_SOURCE";
pub const ENV_HERO_CANDIDATES: &str = "FEED_HERO_CANDIDATES";
pub const ENV_CACHE_TTL_MS: &str = "FEED_CACHE_TTL_MS";
pub const ENV_FETCH_TIMEOUT_MS: &str = "FEED_FETCH_TIMEOUT_MS";
pub const ENV_MAX_LIMIT: &str = "FEED_MAX_LIMIT";
pub const ENV_USER_AGENT: &str = "FEED_USER_AGENT";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Articles kept per source per fetch.
    pub items_per_source: usize,
    /// Prefix of the aggregated list considered for the hero slot.
    pub hero_candidates: usize,
    pub cache_ttl: Duration,
    /// Per-source budget; a timed-out fetch counts as that source failing.
    pub fetch_timeout: Duration,
    /// Upper bound for `?limit=` and its default.
    pub max_limit: usize,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            items_per_source: ITEMS_PER_SOURCE,
            hero_candidates: HERO_CANDIDATES,
            cache_ttl: CACHE_TTL,
            fetch_timeout: FETCH_TIMEOUT,
            max_limit: MAX_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by any valid env values; invalid values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            items_per_source: parse_positive(lookup(ENV_ITEMS_PER_SOURCE))
                .unwrap_or(d.items_per_source),
            hero_candidates: parse_positive(lookup(ENV_HERO_CANDIDATES))
                .unwrap_or(d.hero_candidates),
            cache_ttl: parse_positive(lookup(ENV_CACHE_TTL_MS))
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(d.cache_ttl),
            fetch_timeout: parse_positive(lookup(ENV_FETCH_TIMEOUT_MS))
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(d.fetch_timeout),
            max_limit: parse_positive(lookup(ENV_MAX_LIMIT)).unwrap_or(d.max_limit),
            user_agent: lookup(ENV_USER_AGENT)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(d.user_agent),
        }
    }
}

// parse optional positive integer env
fn parse_positive(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_policy_constants() {
        let c = PipelineConfig::default();
        assert_eq!(c.items_per_source, 10);
        assert_eq!(c.hero_candidates, 30);
        assert_eq!(c.cache_ttl, Duration::from_secs(300));
        assert_eq!(c.fetch_timeout, Duration::from_secs(10));
        assert_eq!(c.max_limit, 300);
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = [
            (ENV_CACHE_TTL_MS, "50"),
            (ENV_ITEMS_PER_SOURCE, "abc"),
            (ENV_HERO_CANDIDATES, "0"),
            (ENV_USER_AGENT, "  "),
        ]
        .into_iter()
        .collect();
        let c = PipelineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.cache_ttl, Duration::from_millis(50));
        assert_eq!(c.items_per_source, ITEMS_PER_SOURCE);
        assert_eq!(c.hero_candidates, HERO_CANDIDATES);
        assert_eq!(c.user_agent, DEFAULT_USER_AGENT);
    }
}
