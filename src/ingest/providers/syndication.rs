// src/ingest/providers/syndication.rs
use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;

use crate::ingest::types::{FeedItem, FeedSource};
use crate::ingest::{clean_categories, item_id, normalize_title};

/// VulDB "recent entries" feed, the default source.
pub const DEFAULT_FEED_URL: &str = "https://vuldb.com/?rss.recent";

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<TextNode>,
    // Dublin Core, used by RSS 1.0 and by some RSS 2.0 feeds.
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
    #[serde(rename = "subject", alias = "dc:subject", default)]
    dc_subject: Vec<TextNode>,
}

// --- RSS 1.0 (RDF): items are siblings of the channel ---

#[derive(Debug, Deserialize)]
struct RdfDoc {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/// Element whose text we want, whatever attributes it carries.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term", default)]
    term: String,
}

// --- JSON Feed ---

#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    title: Option<String>,
    url: Option<String>,
    external_url: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
    Json,
}

/// Parse an RSS 2.0, RSS 1.0 (RDF), Atom or JSON Feed document into feed
/// items, in document order.
pub fn parse_feed(s: &str) -> Result<Vec<FeedItem>> {
    let kind = detect_kind(s);
    if kind == FeedKind::Json {
        return parse_json_feed(s);
    }
    let xml_clean = resolve_html_entities(s);
    match kind {
        FeedKind::Atom => parse_atom(&xml_clean),
        FeedKind::Rdf => parse_rdf(&xml_clean),
        _ => parse_rss(&xml_clean),
    }
}

/// Pick the dialect from the root element; anything unrecognised is tried as RSS.
fn detect_kind(s: &str) -> FeedKind {
    let s = s.trim_start_matches('\u{feff}').trim_start();
    if s.starts_with('{') {
        return FeedKind::Json;
    }
    let mut reader = quick_xml::Reader::from_str(s);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"feed" => FeedKind::Atom,
                    b"RDF" => FeedKind::Rdf,
                    _ => FeedKind::Rss,
                };
            }
            Ok(Event::Eof) | Err(_) => return FeedKind::Rss,
            Ok(_) => {}
        }
    }
}

fn parse_rss(s: &str) -> Result<Vec<FeedItem>> {
    let rss: Rss = from_str(s).context("parsing rss xml")?;
    Ok(rss_items(rss.channel.item))
}

fn parse_rdf(s: &str) -> Result<Vec<FeedItem>> {
    let rdf: RdfDoc = from_str(s).context("parsing rss 1.0 (rdf) xml")?;
    Ok(rss_items(rdf.item))
}

fn rss_items(items: Vec<RssItem>) -> Vec<FeedItem> {
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let categories = clean_categories(
            it.category
                .iter()
                .chain(it.dc_subject.iter())
                .map(|c| c.value.as_str()),
        );
        let published = it.pub_date.or(it.dc_date);
        if let Some(item) = build_item(it.title, it.link, published, categories) {
            out.push(item);
        }
    }
    out
}

fn parse_json_feed(s: &str) -> Result<Vec<FeedItem>> {
    let feed: JsonFeed = serde_json::from_str(s).context("parsing json feed")?;
    let mut out = Vec::with_capacity(feed.items.len());
    for it in feed.items {
        let link = it.url.or(it.external_url);
        let published = it.date_published.or(it.date_modified);
        let categories = clean_categories(&it.tags);
        if let Some(item) = build_item(it.title, link, published, categories) {
            out.push(item);
        }
    }
    Ok(out)
}

fn parse_atom(s: &str) -> Result<Vec<FeedItem>> {
    let feed: AtomFeed = from_str(s).context("parsing atom xml")?;
    let mut out = Vec::with_capacity(feed.entry.len());
    for entry in feed.entry {
        let link = entry.alternate_link().map(str::to_string);
        let categories = clean_categories(entry.category.iter().map(|c| c.term.as_str()));
        let published = entry.published.or(entry.updated);
        let title = entry.title.map(|t| t.value);
        if let Some(item) = build_item(title, link, published, categories) {
            out.push(item);
        }
    }
    Ok(out)
}

fn build_item(
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    categories: Vec<String>,
) -> Option<FeedItem> {
    let title = normalize_title(title.as_deref().unwrap_or_default());
    let link = link.unwrap_or_default().trim().to_string();
    if title.is_empty() {
        tracing::debug!(link = %link, "feed entry without title skipped");
        return None;
    }
    let published = published.unwrap_or_default().trim().to_string();
    Some(FeedItem {
        id: item_id(&link, &title, &published),
        title,
        link,
        published,
        categories,
    })
}

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Feeds routinely use HTML named entities (`&nbsp;`, `&eacute;`, ...) that
/// XML does not declare. Resolve them outside CDATA sections so the parser
/// accepts the document; the five XML entities are left for the parser.
fn resolve_html_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(CDATA_OPEN) {
        out.push_str(&resolve_in_markup(&rest[..start]));
        let section = &rest[start..];
        let end = section
            .find(CDATA_CLOSE)
            .map(|i| i + CDATA_CLOSE.len())
            .unwrap_or(section.len());
        out.push_str(&section[..end]);
        rest = &section[end..];
    }
    out.push_str(&resolve_in_markup(rest));
    Cow::Owned(out)
}

fn resolve_in_markup(s: &str) -> Cow<'_, str> {
    static RE_ENTITY: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| regex::Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());
    re.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            // Unknown name: keep it as literal text.
            return format!("&amp;{name};");
        }
        html_escape::encode_quoted_attribute(&decoded).into_owned()
    })
}

pub struct SyndicationProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl SyndicationProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    /// Read the whole document from disk up front (`--feed-file`).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading feed file {}", path.display()))?;
        Ok(Self::from_fixture_str(&content))
    }

    pub fn from_url(url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        })
    }
}

#[async_trait]
impl FeedSource for SyndicationProvider {
    async fn fetch_items(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http { url, client } => {
                tracing::debug!(url = %url, "fetching feed");
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("feed http status {url}"))?
                    .text()
                    .await
                    .context("feed http .text()")?;
                tracing::debug!(url = %url, bytes = body.len(), "feed downloaded");
                parse_feed(&body).with_context(|| format!("parsing feed from {url}"))
            }
        }
    }

    fn name(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url.as_str(),
        }
    }
}
