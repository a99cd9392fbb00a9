// src/ingest/normalize.rs
//! Pure text helpers that turn raw feed fields into article fields:
//! HTML cleanup, entity decoding, truncation, identity, lead image, dates.
//!
//! Lengths are counted in `char`s, never bytes.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::RawItem;

pub const FULL_DESCRIPTION_MAX: usize = 800;
pub const DESCRIPTION_MAX: usize = 150;
/// A sentence cut is only taken when it keeps more than this many chars.
pub const SENTENCE_CUT_MIN: usize = 80;
pub const ELLIPSIS: &str = "...";
/// Hex chars kept from the identity digest.
pub const ARTICLE_ID_LEN: usize = 16;

static RE_CONTINUE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>\s*continue reading[^<]*</a>").unwrap());
static RE_PARA_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p>\s*<p\b[^>]*>").unwrap());
static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static RE_CONTINUE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*continue reading(\.{3}|…)\s*$").unwrap());
static RE_LINE_PAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").unwrap());
static RE_MANY_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap());
static RE_IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp)").unwrap());

/// Decode HTML entities, then fold typographic quotes and NBSP to ASCII.
/// En/em dashes stay as Unicode dashes.
pub fn decode_entities(s: &str) -> String {
    let out = html_escape::decode_html_entities(s);
    out.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ")
}

pub fn strip_tags(s: &str) -> String {
    RE_TAGS.replace_all(s, "").into_owned()
}

/// Markup → readable text with paragraph breaks preserved.
pub fn clean_html(s: &str) -> String {
    let mut out = RE_CONTINUE_ANCHOR.replace_all(s, "").into_owned();
    out = out.replace("\r\n", "\n").replace('\r', "\n");

    // 1) Paragraph and line breaks
    out = RE_PARA_BREAK.replace_all(&out, "\n\n").into_owned();
    out = RE_BR.replace_all(&out, "\n").into_owned();

    // 2) Tags, entities, and tags that were hiding behind entities
    out = strip_tags(&out);
    out = decode_entities(&out);
    out = strip_tags(&out);

    // 3) Plain-text "Continue reading..." left at the end
    out = RE_CONTINUE_TAIL.replace(&out, "").into_owned();

    // 4) Whitespace
    out = RE_LINE_PAD.replace_all(&out, "\n").into_owned();
    out = RE_MANY_NEWLINES.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

/// Plain-text snippet of a field: tags out, entities decoded, trimmed.
pub fn snippet(s: &str) -> String {
    let out = decode_entities(&strip_tags(s));
    let out = strip_tags(&out);
    RE_CONTINUE_TAIL.replace(out.trim(), "").trim().to_string()
}

/// Cap `s` at `max` chars; when longer, keep `max - 3` chars and append `...`.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Longer of the cleaned rich content and the plain snippet, capped at 800 chars.
pub fn full_description(rich: Option<&str>, plain: Option<&str>) -> String {
    let cleaned = rich.map(clean_html).unwrap_or_default();
    let snip = plain.map(snippet).unwrap_or_default();

    let best = if cleaned.chars().count() > snip.chars().count() {
        cleaned
    } else {
        snip
    };
    truncate_with_ellipsis(&best, FULL_DESCRIPTION_MAX)
}

/// First paragraph, cut at a sentence boundary when it is too long.
pub fn short_description(full: &str) -> String {
    let first = full.split("\n\n").next().unwrap_or(full);
    if first.chars().count() <= DESCRIPTION_MAX {
        return first.to_string();
    }

    let head: String = first.chars().take(DESCRIPTION_MAX).collect();
    if let Some(idx) = head.rfind(". ") {
        if head[..idx].chars().count() > SENTENCE_CUT_MIN {
            return head[..=idx].to_string();
        }
    }
    truncate_with_ellipsis(first, DESCRIPTION_MAX)
}

/// Stable identity of an item within one source.
pub fn article_id(source_id: &str, url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(ARTICLE_ID_LEN);
    for b in digest.iter().take(ARTICLE_ID_LEN / 2) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn first_img_src(html: &str) -> Option<String> {
    RE_IMG_SRC
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn non_empty(v: &[String]) -> Option<String> {
    v.iter().find(|u| !u.trim().is_empty()).map(|u| u.trim().to_string())
}

/// Lead image: media:content → media:thumbnail → image enclosure →
/// `<img>` in content → `<img>` in content:encoded.
pub fn extract_image_url(item: &RawItem) -> Option<String> {
    non_empty(&item.media_content)
        .or_else(|| non_empty(&item.media_thumbnail))
        .or_else(|| {
            item.enclosures
                .iter()
                .find(|u| RE_IMAGE_EXT.is_match(u))
                .map(|u| u.trim().to_string())
        })
        .or_else(|| item.content.as_deref().and_then(first_img_src))
        .or_else(|| item.content_encoded.as_deref().and_then(first_img_src))
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, dc:date); `None` when unparseable.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}
