// tests/ingest_fetch.rs
//
// Fetch + parse + normalise against canned feed documents.
//
// Covered:
// - RSS 2.0 with content:encoded, dc:creator, media:*, enclosures, CDATA and entities
// - the description is the article text; content:encoded only lends an image
// - channel and item <atom:link> elements sit beside <link> without clashing
// - Atom entries (alternate link, updated-only dates, enclosure links)
// - items without a link are dropped, bad dates fall back to fetch time
// - ids are stable across fetches and unique per URL
// - broken upstream documents and dead hosts are errors, not panics

use chrono::{DateTime, TimeZone, Utc};
use newsdesk::ingest::{self, transport::FixtureTransport};
use newsdesk::registry::{Category, FeedSource};
use newsdesk::Article;

const GUARDIAN_XML: &str = include_str!("fixtures/guardian_world.xml");
const VERGE_ATOM: &str = include_str!("fixtures/verge_atom.xml");
const BROKEN_XML: &str = include_str!("fixtures/broken.xml");

fn guardian() -> FeedSource {
    FeedSource::new(
        "guardian-world",
        "The Guardian",
        "https://www.theguardian.com/world/rss",
        Category::World,
    )
}

fn verge() -> FeedSource {
    FeedSource::new(
        "verge",
        "The Verge",
        "https://www.theverge.com/rss/index.xml",
        Category::Tech,
    )
}

fn fetched_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

async fn load(source: &FeedSource, xml: &str, limit: usize) -> Vec<Article> {
    let transport = FixtureTransport::new().with(&source.url, xml);
    ingest::fetch_and_normalise(source, &transport, limit, fetched_at())
        .await
        .expect("fixture should parse")
}

#[tokio::test]
async fn rss_fixture_produces_clean_articles() {
    let src = guardian();
    let items = load(&src, GUARDIAN_XML, 10).await;

    // 5 items upstream, one without a link
    assert_eq!(items.len(), 4);

    let summit = &items[0];
    assert_eq!(summit.title, "Leaders gather for climate summit & talks");
    assert_eq!(
        summit.url,
        "https://www.theguardian.com/world/2025/jun/10/climate-summit-leaders"
    );
    assert_eq!(summit.source.id, "guardian-world");
    assert_eq!(summit.source.name, "The Guardian");
    assert_eq!(summit.category, Category::World);
    assert_eq!(summit.author.as_deref(), Some("Jane Reporter"));
    assert_eq!(
        summit.published_at,
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap()
    );
    assert_eq!(
        summit.image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/summit-140.jpg"),
        "first media:content wins"
    );
    assert_eq!(
        summit.description,
        "World leaders arrive for a week of negotiations."
    );
    assert_eq!(
        summit.full_description,
        "World leaders arrive for a week of negotiations.\n\n\
         Delegates said the \"talks would be hard\" but expected progress."
    );
    assert!(
        !summit.full_description.contains("emitters"),
        "content:encoded is not the article text"
    );

    let pm = &items[1];
    assert_eq!(pm.title, "PM's statement on flooding");
    assert_eq!(pm.description, "Short text with bold markup.");
    assert_eq!(
        pm.image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/flood.JPG")
    );
}

#[tokio::test]
async fn long_content_is_bounded() {
    let items = load(&guardian(), GUARDIAN_XML, 10).await;
    let long = items
        .iter()
        .find(|a| a.title.starts_with("Long read"))
        .expect("long read present");

    assert_eq!(long.full_description.chars().count(), 800);
    assert!(long.full_description.ends_with("..."));
    assert!(long.full_description.contains("\n\n"), "paragraphs kept");
    assert!(long.description.chars().count() <= 150);
    assert!(long.description.ends_with("..."));
    assert_eq!(
        long.image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/coast-thumb.jpg")
    );

    for a in &items {
        assert!(a.full_description.chars().count() <= 800, "{}", a.title);
        assert!(a.description.chars().count() <= 150, "{}", a.title);
    }
}

#[tokio::test]
async fn untidy_fields_are_trimmed_and_bad_dates_fall_back() {
    let items = load(&guardian(), GUARDIAN_XML, 10).await;
    let markets = items.last().expect("non-empty");

    assert_eq!(markets.title, "Markets steady after overnight slide");
    assert_eq!(
        markets.url,
        "https://www.theguardian.com/business/2025/jun/10/markets-steady"
    );
    assert_eq!(markets.published_at, fetched_at());
    assert_eq!(markets.description, "Shares recovered some ground on Tuesday.");
}

#[tokio::test]
async fn namespaced_elements_fill_their_fields() {
    let items = load(&guardian(), GUARDIAN_XML, 10).await;
    let by_title = |prefix: &str| -> Article {
        items
            .iter()
            .find(|a| a.title.starts_with(prefix))
            .cloned()
            .unwrap_or_else(|| panic!("{prefix} present"))
    };

    // dc:creator
    assert_eq!(by_title("Leaders").author.as_deref(), Some("Jane Reporter"));
    // media:content
    assert_eq!(
        by_title("Leaders").image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/summit-140.jpg")
    );
    // media:thumbnail
    assert_eq!(
        by_title("Long read").image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/coast-thumb.jpg")
    );
    // <img> inside content:encoded, item also carries an <atom:link>
    let markets = by_title("Markets");
    assert_eq!(
        markets.url,
        "https://www.theguardian.com/business/2025/jun/10/markets-steady"
    );
    assert_eq!(
        markets.image_url.as_deref(),
        Some("https://i.guim.co.uk/img/media/markets-board.jpg")
    );
}

#[tokio::test]
async fn atom_fixture_is_supported() {
    let items = load(&verge(), VERGE_ATOM, 10).await;
    assert_eq!(items.len(), 2);

    let chip = &items[0];
    assert_eq!(chip.title, "Chip maker unveils new laptop processor");
    assert_eq!(
        chip.url,
        "https://www.theverge.com/2025/6/10/chip-maker-laptop-processor"
    );
    assert_eq!(
        chip.published_at,
        Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap()
    );
    assert_eq!(
        chip.image_url.as_deref(),
        Some("https://cdn.vox-cdn.com/uploads/chip.jpg")
    );
    assert_eq!(chip.author.as_deref(), Some("Sam Writer"));
    assert_eq!(
        chip.full_description,
        "The company said the new processor doubles battery life in thin and light machines."
    );

    let streaming = &items[1];
    assert_eq!(streaming.url, "https://www.theverge.com/2025/6/10/streaming-prices");
    assert_eq!(
        streaming.published_at,
        Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap()
    );
    assert_eq!(
        streaming.image_url.as_deref(),
        Some("https://cdn.vox-cdn.com/uploads/streaming.png")
    );
    assert_eq!(
        streaming.description,
        "Subscribers will pay two dollars more from July."
    );
}

#[tokio::test]
async fn ids_are_stable_and_unique() {
    let first = load(&guardian(), GUARDIAN_XML, 10).await;
    let second = load(&guardian(), GUARDIAN_XML, 10).await;

    let ids: Vec<_> = first.iter().map(|a| a.id.clone()).collect();
    let again: Vec<_> = second.iter().map(|a| a.id.clone()).collect();
    assert_eq!(ids, again);

    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids
        .iter()
        .all(|id| id.len() == 16 && id.chars().all(|c| c.is_ascii_hexdigit())));
}

#[tokio::test]
async fn per_source_limit_applies() {
    let items = load(&guardian(), GUARDIAN_XML, 2).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Leaders gather for climate summit & talks");
}

#[tokio::test]
async fn broken_document_and_dead_host_are_errors() {
    let src = guardian();

    let html = FixtureTransport::new().with(&src.url, BROKEN_XML);
    let err = ingest::fetch_and_normalise(&src, &html, 10, fetched_at())
        .await
        .expect_err("html page is not a feed");
    assert!(format!("{err:#}").contains("guardian-world"));

    let nothing = FixtureTransport::new();
    assert!(ingest::fetch_and_normalise(&src, &nothing, 10, fetched_at())
        .await
        .is_err());
}
