//! Content sources
//!
//! A source is one content provider. It can list the articles currently on
//! its index and retrieve a single article in full. The crawler only depends
//! on the `Source` trait; `HttpSource` is the configurable implementation used
//! by the binary.

mod http;
mod parser;

pub use http::HttpSource;
pub use parser::{parse_article, parse_listing, parse_timestamp, ListingRules};

use crate::models::FullArticle;
use crate::CrawlError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

/// One entry of a source's current listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    /// Canonical article link
    pub link: String,

    /// Publication time, when the listing exposes one
    pub published_at: Option<DateTime<Utc>>,
}

impl ListingItem {
    pub fn new(link: impl Into<String>, published_at: Option<DateTime<Utc>>) -> Self {
        Self {
            link: link.into(),
            published_at,
        }
    }
}

/// A content provider the crawler discovers articles from
///
/// Every call receives the HTTP client to use, already configured with the
/// request timeout and the proxy assigned to the current job.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identifier, recorded on every discovered item
    fn id(&self) -> &str;

    /// Lists the articles currently on the source's index
    async fn list_current(&self, client: &Client) -> Result<Vec<ListingItem>, CrawlError>;

    /// Retrieves one article in full
    async fn fetch(&self, client: &Client, link: &str) -> Result<FullArticle, CrawlError>;
}
