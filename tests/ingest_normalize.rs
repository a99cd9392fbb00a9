// tests/ingest_normalize.rs
//
// Text-level guarantees of the normaliser, independent of any feed format.

use std::collections::HashSet;

use newsdesk::ingest::normalize::{
    article_id, clean_html, decode_entities, full_description, short_description,
    truncate_with_ellipsis, DESCRIPTION_MAX, FULL_DESCRIPTION_MAX,
};
use regex::Regex;

#[test]
fn entities_decode_and_leave_no_tags() {
    let raw = "&lt;p&gt;Fish &amp; chips&lt;/p&gt; &#8216;quoted&#8217; &ldquo;double&rdquo;&nbsp;end";
    let out = clean_html(raw);

    assert_eq!(out, "Fish & chips 'quoted' \"double\" end");
    let tag = Regex::new(r"<[^>]+>").unwrap();
    assert!(!tag.is_match(&out));
}

#[test]
fn dashes_survive_decoding() {
    assert_eq!(decode_entities("a &ndash; b &mdash; c"), "a \u{2013} b \u{2014} c");
}

#[test]
fn continue_reading_links_are_removed() {
    let html = r#"<p>The story so far.</p> <a href="https://x.test/a">Continue reading...</a>"#;
    assert_eq!(clean_html(html), "The story so far.");

    let plain = "The story so far. Continue reading…";
    assert_eq!(clean_html(plain), "The story so far.");
}

#[test]
fn paragraphs_and_line_breaks_are_kept() {
    let html = "<p>One</p>\r\n<p class=\"x\">Two<br/>still two</p>\n\n\n\n<p>Three</p>";
    let out = clean_html(html);
    assert_eq!(out, "One\n\nTwo\nstill two\n\nThree");
}

#[test]
fn descriptions_respect_bounds() {
    let sentence = "Ministers met again today to discuss the plan in detail. ";
    let body = sentence.repeat(40);

    let full = full_description(Some(&body), None);
    assert!(full.chars().count() <= FULL_DESCRIPTION_MAX);
    assert!(full.ends_with("..."));

    let short = short_description(&full);
    assert!(short.chars().count() <= DESCRIPTION_MAX);
    // a sentence boundary past 80 chars is preferred over a hard cut
    assert!(short.ends_with('.'), "got {short:?}");
}

#[test]
fn short_text_is_untouched() {
    assert_eq!(truncate_with_ellipsis("short", 150), "short");
    assert_eq!(short_description("One line."), "One line.");
    assert_eq!(full_description(None, None), "");
}

#[test]
fn truncation_counts_chars_not_bytes() {
    let s = "é".repeat(200);
    let out = truncate_with_ellipsis(&s, 150);
    assert_eq!(out.chars().count(), 150);
    assert!(out.starts_with("ééé"));
}

#[test]
fn ids_are_distinct_across_many_urls() {
    let ids: HashSet<String> = (0..10_000)
        .map(|i| article_id("bbc-world", &format!("https://www.bbc.co.uk/news/world-{i}")))
        .collect();
    assert_eq!(ids.len(), 10_000);
}

#[test]
fn id_depends_on_source_and_url() {
    let a = article_id("bbc-world", "https://x.test/1");
    assert_eq!(a, article_id("bbc-world", "https://x.test/1"));
    assert_ne!(a, article_id("bbc-uk", "https://x.test/1"));
    assert_ne!(a, article_id("bbc-world", "https://x.test/2"));
}
