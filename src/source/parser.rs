//! Selector-driven HTML extraction for listings and articles
//!
//! Nothing here knows about a particular site. Listing extraction is driven
//! by the CSS selectors configured for each source; article extraction reads
//! standard metadata (`og:*`, `article:*`, `meta name=...`) and the block
//! elements of the article body.

use crate::models::{ArticleAuthor, ContentBlock, FullArticle, ImageContent, VideoContent};
use crate::source::ListingItem;
use chrono::{DateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Attribute read for the publication time when none is configured
const DEFAULT_TIME_ATTRIBUTE: &str = "datetime";

/// Selectors describing how to read one source's index page
#[derive(Debug, Clone)]
pub struct ListingRules {
    /// Matches each listed article (an anchor, or a container holding one)
    item: Selector,

    /// Matches the publication time inside an item
    time: Option<Selector>,

    /// Attribute of the time element holding the timestamp
    time_attribute: String,
}

impl ListingRules {
    /// Compiles listing rules
    ///
    /// # Returns
    ///
    /// * `Ok(ListingRules)` - All selectors parsed
    /// * `Err(String)` - A selector is invalid
    pub fn new(
        item: &str,
        time: Option<&str>,
        time_attribute: Option<&str>,
    ) -> Result<Self, String> {
        let item = parse_selector(item)?;
        let time = time.map(parse_selector).transpose()?;

        Ok(Self {
            item,
            time,
            time_attribute: time_attribute
                .unwrap_or(DEFAULT_TIME_ATTRIBUTE)
                .to_string(),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector '{}': {}", selector, e))
}

/// Extracts listing items from an index page
///
/// Links are resolved against `base_url` and de-duplicated, keeping the
/// first occurrence. Items whose time cannot be read get `published_at: None`.
pub fn parse_listing(html: &str, base_url: &Url, rules: &ListingRules) -> Vec<ListingItem> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").ok();

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for element in document.select(&rules.item) {
        let href = element.value().attr("href").or_else(|| {
            anchor
                .as_ref()
                .and_then(|a| element.select(a).next())
                .and_then(|a| a.value().attr("href"))
        });

        let Some(link) = href.and_then(|href| resolve_link(href, base_url)) else {
            continue;
        };

        if !seen.insert(link.clone()) {
            continue;
        }

        let published_at = rules
            .time
            .as_ref()
            .and_then(|time| element.select(time).next())
            .and_then(|time| read_time(time, &rules.time_attribute));

        items.push(ListingItem { link, published_at });
    }

    items
}

fn read_time(element: ElementRef<'_>, attribute: &str) -> Option<DateTime<Utc>> {
    let raw = match element.value().attr(attribute) {
        Some(value) => value.to_string(),
        None => element.text().collect::<String>(),
    };
    parse_timestamp(raw.trim())
}

/// Parses a unix timestamp (seconds) or an RFC 3339 date
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<i64>() {
        return Utc.timestamp_opt(seconds, 0).single();
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Builds a `FullArticle` from an article page
pub fn parse_article(html: &str, link: &str, source_id: &str) -> FullArticle {
    let document = Html::parse_document(html);
    let base_url = Url::parse(link).ok();

    let headline = meta_content(&document, "meta[property='og:title']")
        .or_else(|| first_text(&document, "h1"))
        .or_else(|| first_text(&document, "title"))
        .unwrap_or_default();

    let description = meta_content(&document, "meta[name='description']")
        .or_else(|| meta_content(&document, "meta[property='og:description']"))
        .unwrap_or_default();

    let published_at = meta_content(&document, "meta[property='article:published_time']")
        .and_then(|raw| parse_timestamp(&raw));
    let updated_at = meta_content(&document, "meta[property='article:modified_time']")
        .and_then(|raw| parse_timestamp(&raw));

    let author = meta_content(&document, "meta[name='author']").map(|name| ArticleAuthor {
        name,
        profile_url: None,
    });

    FullArticle {
        source: source_id.to_string(),
        link: link.to_string(),
        headline,
        description,
        published_at,
        updated_at,
        author,
        contents: extract_contents(&document, base_url.as_ref()),
        related: Vec::new(),
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

/// Collects body blocks in document order
///
/// Looks inside the first `<article>` element, falling back to `<body>`.
fn extract_contents(document: &Html, base_url: Option<&Url>) -> Vec<ContentBlock> {
    let Ok(blocks) = Selector::parse("h2, h3, p, img, video, iframe") else {
        return Vec::new();
    };

    let root = ["article", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|s| document.select(&s).next());

    let Some(root) = root else {
        return Vec::new();
    };

    let resolve = |src: &str| match base_url {
        Some(base) => resolve_link(src, base),
        None => Some(src.to_string()),
    };

    let mut contents = Vec::new();
    for element in root.select(&blocks) {
        let value = element.value();
        match value.name() {
            "h2" | "h3" => {
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    contents.push(ContentBlock::SectionTitle(text));
                }
            }
            "p" => {
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    contents.push(ContentBlock::Paragraph(text));
                }
            }
            "img" => {
                if let Some(url) = value.attr("src").and_then(&resolve) {
                    contents.push(ContentBlock::Image(ImageContent {
                        url,
                        title: value.attr("title").unwrap_or_default().to_string(),
                        caption: String::new(),
                        alt: value.attr("alt").unwrap_or_default().to_string(),
                        width: value.attr("width").and_then(|w| w.parse().ok()),
                        height: value.attr("height").and_then(|h| h.parse().ok()),
                    }));
                }
            }
            "video" | "iframe" => {
                if let Some(url) = value.attr("src").and_then(&resolve) {
                    let embedded = value.name() == "iframe";
                    contents.push(ContentBlock::Video(VideoContent {
                        embedded_url: if embedded { url.clone() } else { String::new() },
                        url,
                        title: value.attr("title").unwrap_or_default().to_string(),
                        thumbnail: value.attr("poster").unwrap_or_default().to_string(),
                        ..VideoContent::default()
                    }));
                }
            }
            _ => {}
        }
    }

    contents
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    // Fragments never identify a different article.
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
