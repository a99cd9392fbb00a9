//! # Source Registry
//!
//! Static catalogue of feed sources and the per-source priority weights
//! used by hero selection.
//!
//! - Loads from a TOML config (sources + optional priorities).
//! - Falls back to a built-in `default_seed()` when no config is present
//!   or the file cannot be read/parsed.
//! - `all` is a sentinel category that selects every source; unknown
//!   categories select nothing.
//! - Unknown source ids get `default_priority`, never an error.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path, str::FromStr};

pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";
pub const ENV_SOURCES_PATH: &str = "FEED_SOURCES_PATH";
pub const DEFAULT_PRIORITY: f64 = 5.0;

/// Concrete feed category. The request-level `all` sentinel is not a
/// category of its own; see [`CategoryFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    Finance,
    Uk,
    World,
    Sport,
    Culture,
    Science,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Tech,
        Category::Finance,
        Category::Uk,
        Category::World,
        Category::Sport,
        Category::Culture,
        Category::Science,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Finance => "finance",
            Category::Uk => "uk",
            Category::World => "world",
            Category::Sport => "sport",
            Category::Culture => "culture",
            Category::Science => "science",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == norm)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s:?}"))
    }
}

/// What a request asks for: every source, one category, or a category
/// name nobody publishes under (which matches no source).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
    Unknown(String),
}

impl CategoryFilter {
    /// Parse a request value. `None` for anything that is neither `all`
    /// nor a known category.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(CategoryFilter::All);
        }
        s.parse().ok().map(CategoryFilter::Only)
    }

    /// Lenient form of [`CategoryFilter::parse`] for request values: blank
    /// means `all`, unrecognised names become [`CategoryFilter::Unknown`].
    pub fn from_request(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("all");
        CategoryFilter::parse(raw)
            .unwrap_or_else(|| CategoryFilter::Unknown(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(c) => c.as_str(),
            CategoryFilter::Unknown(name) => name,
        }
    }

    /// Cache key used for the aggregated feed of this filter.
    pub fn cache_key(&self) -> String {
        format!("feed-{}", self.as_str())
    }
}

/// One external RSS/Atom endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl FeedSource {
    pub fn new(id: &str, name: &str, url: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            category,
            logo: None,
        }
    }
}

/// On-disk shape of `config/sources.toml`.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default = "default_priority")]
    default_priority: f64,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(flatten)]
    source: FeedSource,
    #[serde(default)]
    priority: Option<f64>,
}

fn default_priority() -> f64 {
    DEFAULT_PRIORITY
}

/// Immutable catalogue of sources plus their hero priorities.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
    priorities: HashMap<String, f64>,
    default_priority: f64,
}

impl SourceRegistry {
    pub fn new(
        sources: Vec<FeedSource>,
        priorities: HashMap<String, f64>,
        default_priority: f64,
    ) -> Self {
        Self {
            sources,
            priorities,
            default_priority,
        }
    }

    /// Load from `$FEED_SOURCES_PATH`, else `config/sources.toml`, else the seed.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_SOURCES_PATH)
            .unwrap_or_else(|_| DEFAULT_SOURCES_PATH.to_string());
        Self::load_from_file(path)
    }

    /// Load configuration from a TOML file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => {
                tracing::debug!(path = %path.display(), "no sources config, using built-in seed");
                return Self::default_seed();
            }
        };
        match Self::from_toml_str(&raw) {
            Ok(reg) => {
                tracing::info!(path = %path.display(), sources = reg.sources.len(), "loaded sources config");
                reg
            }
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.display(), "invalid sources config, using built-in seed");
                Self::default_seed()
            }
        }
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let file: RegistryFile = toml::from_str(s)?;
        let mut priorities = HashMap::new();
        let mut sources = Vec::with_capacity(file.sources.len());
        for entry in file.sources {
            if let Some(p) = entry.priority {
                priorities.insert(entry.source.id.clone(), p);
            }
            sources.push(entry.source);
        }
        Ok(Self::new(sources, priorities, file.default_priority))
    }

    pub fn all(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Sources for a raw request value: `all` → every source, a known
    /// category → exact matches, anything else → empty.
    pub fn sources_for_category(&self, category: &str) -> Vec<FeedSource> {
        match CategoryFilter::parse(category) {
            Some(filter) => self.sources_for(&filter),
            None => Vec::new(),
        }
    }

    pub fn sources_for(&self, filter: &CategoryFilter) -> Vec<FeedSource> {
        match filter {
            CategoryFilter::All => self.sources.clone(),
            CategoryFilter::Only(c) => self
                .sources
                .iter()
                .filter(|s| s.category == *c)
                .cloned()
                .collect(),
            CategoryFilter::Unknown(_) => Vec::new(),
        }
    }

    pub fn source_by_id(&self, id: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Hero priority for a source id; `default_priority` when unweighted.
    pub fn priority_of(&self, source_id: &str) -> f64 {
        self.priorities
            .get(source_id)
            .copied()
            .unwrap_or(self.default_priority)
    }

    pub fn default_priority(&self) -> f64 {
        self.default_priority
    }

    /// Built-in UK-centric catalogue.
    pub fn default_seed() -> Self {
        use Category::*;

        let sources = [
            // Tech
            ("techcrunch", "TechCrunch", "https://techcrunch.com/feed/", Tech),
            ("verge", "The Verge", "https://www.theverge.com/rss/index.xml", Tech),
            ("ars", "Ars Technica", "https://feeds.arstechnica.com/arstechnica/index", Tech),
            ("guardian-tech", "Guardian Tech", "https://www.theguardian.com/uk/technology/rss", Tech),
            // Finance
            ("bbc-business", "BBC Business", "https://feeds.bbci.co.uk/news/business/rss.xml", Finance),
            ("ft-markets", "FT Markets", "https://www.ft.com/markets?format=rss", Finance),
            ("guardian-business", "Guardian Business", "https://www.theguardian.com/uk/business/rss", Finance),
            // UK
            ("bbc-uk", "BBC UK", "https://feeds.bbci.co.uk/news/uk/rss.xml", Uk),
            ("guardian-uk", "Guardian UK", "https://www.theguardian.com/uk-news/rss", Uk),
            ("sky-uk", "Sky News UK", "https://feeds.skynews.com/feeds/rss/uk.xml", Uk),
            // World
            ("bbc-world", "BBC World", "https://feeds.bbci.co.uk/news/world/rss.xml", World),
            ("guardian-world", "Guardian World", "https://www.theguardian.com/world/rss", World),
            ("aljazeera", "Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml", World),
            // Sport
            ("bbc-sport", "BBC Sport", "https://feeds.bbci.co.uk/sport/rss.xml", Sport),
            ("sky-sports", "Sky Sports", "https://www.skysports.com/rss/12040", Sport),
            ("guardian-sport", "Guardian Sport", "https://www.theguardian.com/uk/sport/rss", Sport),
            // Culture
            ("bbc-entertainment", "BBC Entertainment", "https://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml", Culture),
            ("guardian-music", "Guardian Music", "https://www.theguardian.com/music/rss", Culture),
            ("guardian-film", "Guardian Film", "https://www.theguardian.com/film/rss", Culture),
            ("guardian-tv", "Guardian TV & Radio", "https://www.theguardian.com/tv-and-radio/rss", Culture),
            ("nme", "NME", "https://www.nme.com/feed", Culture),
            ("pitchfork", "Pitchfork", "https://pitchfork.com/feed/feed-news/rss", Culture),
            // Science & environment
            ("bbc-science", "BBC Science", "https://feeds.bbci.co.uk/news/science_and_environment/rss.xml", Science),
            ("guardian-science", "Guardian Science", "https://www.theguardian.com/science/rss", Science),
            ("guardian-environment", "Guardian Environment", "https://www.theguardian.com/environment/rss", Science),
            ("nasa", "NASA", "https://www.nasa.gov/rss/dyn/breaking_news.rss", Science),
            ("new-scientist", "New Scientist", "https://www.newscientist.com/section/news/feed/", Science),
            // Wire + international, filed under world
            ("reuters-world", "Reuters", "https://www.reutersagency.com/feed/?best-regions=europe&post_type=best", World),
            ("euronews", "Euronews", "https://www.euronews.com/rss?level=theme&name=news", World),
            ("france24", "France 24", "https://www.france24.com/en/rss", World),
            ("scmp", "South China Morning Post", "https://www.scmp.com/rss/91/feed", World),
        ]
        .into_iter()
        .map(|(id, name, url, cat)| FeedSource::new(id, name, url, cat))
        .collect();

        let mut priorities = HashMap::new();
        for (k, v) in [
            ("bbc-uk", 10.0),
            ("bbc-world", 10.0),
            ("bbc-business", 9.0),
            ("bbc-science", 9.0),
            ("bbc-sport", 8.0),
            ("bbc-entertainment", 7.0),
            ("guardian-uk", 9.0),
            ("guardian-world", 9.0),
            ("guardian-business", 8.0),
            ("guardian-science", 8.0),
            ("guardian-sport", 7.0),
            ("guardian-environment", 8.0),
            ("reuters-world", 9.0),
            ("aljazeera", 8.0),
            ("sky-uk", 7.0),
            ("sky-sports", 6.0),
            ("ft-markets", 8.0),
            ("euronews", 7.0),
            ("france24", 7.0),
            ("scmp", 7.0),
            ("guardian-tech", 7.0),
            ("techcrunch", 5.0),
            ("verge", 5.0),
            ("ars", 4.0),
            ("guardian-music", 5.0),
            ("guardian-film", 5.0),
            ("guardian-tv", 5.0),
            ("nme", 4.0),
            ("pitchfork", 4.0),
            ("nasa", 6.0),
            ("new-scientist", 5.0),
        ] {
            priorities.insert(k.to_string(), v);
        }

        Self::new(sources, priorities, DEFAULT_PRIORITY)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::default_seed()
    }
}
