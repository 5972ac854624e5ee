use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author byline of an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

/// An image embedded in an article body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A video embedded in an article body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContent {
    pub url: String,
    #[serde(default)]
    pub embedded_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Duration in seconds, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub thumbnail: String,
}

/// One block of article body content
///
/// Serialized as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph(String),
    SectionTitle(String),
    Image(ImageContent),
    Video(VideoContent),
    Link { title: String, url: String },
}

/// A related article referenced from another article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ImageContent>,
}

/// A fully retrieved article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullArticle {
    pub source: String,
    pub link: String,
    pub headline: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<ArticleAuthor>,
    pub contents: Vec<ContentBlock>,
    pub related: Vec<RelatedArticle>,
}
