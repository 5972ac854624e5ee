//! Data model for discovered and retrieved articles
//!
//! - `DiscoveredItem`: a freshly seen article link waiting to be retrieved
//! - `FullArticle`: a retrieved article with its structured content

mod article;

pub use article::{
    ArticleAuthor, ContentBlock, FullArticle, ImageContent, RelatedArticle, VideoContent,
};

use chrono::{DateTime, Utc};

/// One article reference discovered in a source listing
///
/// Created only after the repository reported the link as unknown.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    /// Identifier of the source that listed this article
    pub source_id: String,

    /// Canonical article link, used as the deduplication key
    pub link: String,

    /// When the article was published, or the crawl time if unknown
    pub published_at: DateTime<Utc>,
}

impl DiscoveredItem {
    pub fn new(
        source_id: impl Into<String>,
        link: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            link: link.into(),
            published_at,
        }
    }
}
