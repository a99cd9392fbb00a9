// src/ingest/parser.rs
//! Best-effort RSS 2.0 / RSS 1.0 (RDF) / Atom reader producing [`RawItem`]s.
//!
//! Elements are matched by resolved namespace, not by prefix, so
//! `<content:encoded>`, `<dc:creator>` and `<media:*>` are found whatever
//! prefix a feed binds them to. Undeclared prefixes fall back to the
//! conventional names. Atom links inside an RSS item (`<atom:link>`) are
//! ignored rather than confused with the item's `<link>`.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

use crate::ingest::types::RawItem;

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const RSS1_NS: &[u8] = b"http://purl.org/rss/1.0/";
const CONTENT_NS: &[u8] = b"http://purl.org/rss/1.0/modules/content/";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";
// some publishers drop the trailing slash
const MEDIA_NS_PREFIX: &[u8] = b"http://search.yahoo.com/mrss";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDialect {
    Rss2,
    Rdf,
    Atom,
}

/// Namespace family of an element, relative to the document's dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    /// The dialect's own vocabulary.
    Core,
    /// Atom elements embedded in a non-Atom document.
    Atom,
    Content,
    Dc,
    Media,
    Other,
}

fn classify(res: &ResolveResult, dialect: FeedDialect) -> Ns {
    match res {
        ResolveResult::Unbound => Ns::Core,
        ResolveResult::Bound(ns) => {
            let uri = ns.as_ref();
            if uri == ATOM_NS {
                if dialect == FeedDialect::Atom {
                    Ns::Core
                } else {
                    Ns::Atom
                }
            } else if uri == RSS1_NS {
                Ns::Core
            } else if uri == CONTENT_NS {
                Ns::Content
            } else if uri == DC_NS {
                Ns::Dc
            } else if uri.starts_with(MEDIA_NS_PREFIX) {
                Ns::Media
            } else {
                Ns::Other
            }
        }
        ResolveResult::Unknown(prefix) => match prefix.as_slice() {
            b"content" => Ns::Content,
            b"dc" => Ns::Dc,
            b"media" => Ns::Media,
            b"atom" => Ns::Atom,
            _ => Ns::Other,
        },
    }
}

/// Text-bearing fields of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Published,
    Updated,
    DcDate,
    Description,
    Content,
    ContentEncoded,
    Summary,
    Author,
    AuthorName,
    Creator,
}

/// Field captured by a direct child of the item (`level` 1), or by the
/// `<name>` of an Atom `<author>` (`level` 2).
fn field_for(
    ns: Ns,
    local: &str,
    level: usize,
    parent: Option<&Open>,
    dialect: FeedDialect,
) -> Option<Field> {
    let atom = dialect == FeedDialect::Atom;
    if level == 2 {
        let in_author = parent.is_some_and(|p| p.ns == Ns::Core && p.local == "author");
        let is_name = atom && in_author && ns == Ns::Core && local == "name";
        return is_name.then_some(Field::AuthorName);
    }
    if level != 1 {
        return None;
    }
    match (ns, local) {
        (Ns::Core, "title") => Some(Field::Title),
        (Ns::Core, "link") if !atom => Some(Field::Link),
        (Ns::Core, "pubDate") if !atom => Some(Field::PubDate),
        (Ns::Core, "description") if !atom => Some(Field::Description),
        (Ns::Core, "author") if !atom => Some(Field::Author),
        (Ns::Core, "published") if atom => Some(Field::Published),
        (Ns::Core, "updated") if atom => Some(Field::Updated),
        (Ns::Core, "content") if atom => Some(Field::Content),
        (Ns::Core, "summary") if atom => Some(Field::Summary),
        (Ns::Content, "encoded") => Some(Field::ContentEncoded),
        (Ns::Dc, "creator") => Some(Field::Creator),
        (Ns::Dc, "date") => Some(Field::DcDate),
        _ => None,
    }
}

fn is_item_start(ns: Ns, local: &str, dialect: FeedDialect) -> bool {
    ns == Ns::Core
        && match dialect {
            FeedDialect::Atom => local == "entry",
            FeedDialect::Rss2 | FeedDialect::Rdf => local == "item",
        }
}

#[derive(Debug)]
struct Open {
    ns: Ns,
    local: String,
}

#[derive(Debug)]
struct Capture {
    field: Field,
    /// Path length at which the capturing element was opened.
    at: usize,
    buf: String,
}

/// Everything collected for one item; first non-blank value wins per field.
#[derive(Debug, Default)]
struct ItemFields {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
    description: Option<String>,
    content: Option<String>,
    content_encoded: Option<String>,
    summary: Option<String>,
    author: Option<String>,
    creator: Option<String>,
    media_content: Vec<String>,
    media_thumbnail: Vec<String>,
    enclosures: Vec<String>,
}

fn fill(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.trim().is_empty() {
        *slot = Some(value);
    }
}

impl ItemFields {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::ContentEncoded => &mut self.content_encoded,
            Field::Summary => &mut self.summary,
            Field::Author | Field::AuthorName => &mut self.author,
            Field::Creator => &mut self.creator,
        };
        fill(slot, value);
    }

    /// URL-bearing attributes: media objects, RSS enclosures, Atom links.
    fn take_attributes(
        &mut self,
        ns: Ns,
        local: &str,
        level: usize,
        e: &BytesStart,
        dialect: FeedDialect,
    ) {
        match (ns, local) {
            (Ns::Media, "content") => self.media_content.extend(attr(e, "url")),
            (Ns::Media, "thumbnail") => self.media_thumbnail.extend(attr(e, "url")),
            (Ns::Core, "enclosure") if dialect != FeedDialect::Atom => {
                self.enclosures.extend(attr(e, "url"))
            }
            (Ns::Core, "link") if dialect == FeedDialect::Atom && level == 1 => {
                let Some(href) = attr(e, "href") else {
                    return;
                };
                // rel defaults to "alternate"
                match attr(e, "rel").as_deref() {
                    None | Some("alternate") => fill(&mut self.link, href),
                    Some("enclosure") => self.enclosures.push(href),
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> RawItem {
        RawItem {
            title: self.title,
            link: self.link.map(|l| l.trim().to_string()),
            published: self
                .pub_date
                .or(self.published)
                .or(self.dc_date)
                .or(self.updated),
            content: self.description.or(self.content),
            content_encoded: self.content_encoded,
            summary: self.summary,
            author: self
                .creator
                .or(self.author)
                .map(|a| a.trim().to_string()),
            media_content: self.media_content,
            media_thumbnail: self.media_thumbnail,
            enclosures: self.enclosures,
        }
    }
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn local_of(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Identify the dialect from the root element's local name.
pub fn detect_dialect(xml: &str) -> Result<FeedDialect> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("reading feed root element")? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.local_name();
                return match name.as_ref() {
                    b"rss" => Ok(FeedDialect::Rss2),
                    b"RDF" => Ok(FeedDialect::Rdf),
                    b"feed" => Ok(FeedDialect::Atom),
                    other => Err(anyhow!(
                        "unsupported feed root element <{}>",
                        String::from_utf8_lossy(other)
                    )),
                };
            }
            Event::Eof => return Err(anyhow!("empty feed document")),
            _ => continue,
        }
    }
}

/// Parse a feed document into raw items, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>> {
    let xml = scrub_html_entities_for_xml(xml);
    let dialect = detect_dialect(&xml)?;

    let mut reader = NsReader::from_str(&xml);
    let mut items = Vec::new();
    let mut depth = 0usize;
    // element path inside the current item, the item itself first
    let mut path: Vec<Open> = Vec::new();
    let mut current: Option<ItemFields> = None;
    let mut capture: Option<Capture> = None;

    loop {
        let (ns, event) = {
            let (res, event) = reader
                .read_resolved_event()
                .with_context(|| format!("parsing {dialect:?} xml"))?;
            (classify(&res, dialect), event)
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                let local = local_of(&e);
                match current.as_mut() {
                    None => {
                        if is_item_start(ns, &local, dialect) {
                            current = Some(ItemFields::default());
                            path.push(Open { ns, local });
                        }
                    }
                    Some(item) => {
                        let level = path.len();
                        item.take_attributes(ns, &local, level, &e, dialect);
                        if capture.is_none() {
                            capture = field_for(ns, &local, level, path.last(), dialect)
                                .map(|field| Capture {
                                    field,
                                    at: level + 1,
                                    buf: String::new(),
                                });
                        }
                        path.push(Open { ns, local });
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    let local = local_of(&e);
                    item.take_attributes(ns, &local, path.len(), &e, dialect);
                }
            }
            Event::Text(t) => {
                if let Some(c) = capture.as_mut() {
                    match t.unescape() {
                        Ok(s) => c.buf.push_str(&s),
                        Err(_) => c.buf.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(t) => {
                if let Some(c) = capture.as_mut() {
                    c.buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if current.is_none() {
                    continue;
                }
                if capture.as_ref().is_some_and(|c| c.at == path.len()) {
                    if let (Some(c), Some(item)) = (capture.take(), current.as_mut()) {
                        item.set(c.field, c.buf);
                    }
                }
                path.pop();
                if path.is_empty() {
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                    }
                }
            }
            Event::Eof => {
                if depth != 0 {
                    bail!("{dialect:?} document ends inside an open element");
                }
                break;
            }
            _ => {}
        }
    }
    Ok(items)
}

/// HTML named entities are not valid XML; rewrite the usual suspects as
/// numeric character references before handing the document to the parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&hellip;", "&#8230;")
        .replace("&pound;", "&#163;")
        .replace("&euro;", "&#8364;")
        .replace("&copy;", "&#169;")
}
