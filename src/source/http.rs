//! HTTP-backed source driven by CSS selectors

use crate::config::SourceConfig;
use crate::models::FullArticle;
use crate::source::parser::{parse_article, parse_listing, ListingRules};
use crate::source::{ListingItem, Source};
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// A source that reads an HTML index page over HTTP
#[derive(Debug, Clone)]
pub struct HttpSource {
    id: String,
    index_url: Url,
    rules: ListingRules,
}

impl HttpSource {
    pub fn new(id: impl Into<String>, index_url: Url, rules: ListingRules) -> Self {
        Self {
            id: id.into(),
            index_url,
            rules,
        }
    }

    /// Builds a source from its configuration entry
    pub fn from_config(config: &SourceConfig) -> Result<Self, CrawlError> {
        let index_url = Url::parse(&config.index_url).map_err(|e| CrawlError::Parse {
            url: config.index_url.clone(),
            message: e.to_string(),
        })?;

        let rules = ListingRules::new(
            &config.item_selector,
            config.time_selector.as_deref(),
            config.time_attribute.as_deref(),
        )
        .map_err(|message| CrawlError::Parse {
            url: config.index_url.clone(),
            message,
        })?;

        Ok(Self::new(config.id.clone(), index_url, rules))
    }

    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// GETs `url` and returns the body of a 2xx response
    async fn get_text(&self, client: &Client, url: &str) -> Result<String, CrawlError> {
        let transport = |source: reqwest::Error| CrawlError::Transport {
            source_id: self.id.clone(),
            url: url.to_string(),
            source,
        };

        let response = client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::SourceUnavailable {
                source_id: self.id.clone(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}

#[async_trait]
impl Source for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_current(&self, client: &Client) -> Result<Vec<ListingItem>, CrawlError> {
        let body = self.get_text(client, self.index_url.as_str()).await?;
        let items = parse_listing(&body, &self.index_url, &self.rules);

        tracing::debug!(source = %self.id, items = items.len(), "Parsed index listing");
        Ok(items)
    }

    async fn fetch(&self, client: &Client, link: &str) -> Result<FullArticle, CrawlError> {
        let body = self.get_text(client, link).await?;
        Ok(parse_article(&body, link, &self.id))
    }
}
