//! News-Ripple: a periodic news index crawler
//!
//! This crate discovers new articles from multiple content sources on a
//! randomized schedule, filters out links that are already known, and queues
//! the fresh ones for retrieval. Discovery jobs run under a bounded task pool
//! with cooperative cancellation and rotate through a list of egress proxies.

pub mod config;
pub mod crawler;
pub mod models;
pub mod proxy;
pub mod source;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Main error type for News-Ripple operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task pool error: {0}")]
    Pool(#[from] sync::PoolError),

    #[error("Source {source_id} returned HTTP {status} for {url}")]
    SourceUnavailable {
        source_id: String,
        url: String,
        status: u16,
    },

    #[error("Transport error from {source_id} for {url}: {source}")]
    Transport {
        source_id: String,
        url: String,
        source: reqwest::Error,
    },

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(#[from] storage::StorageError),

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Invalid proxy: {0}")]
    Proxy(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for News-Ripple operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOrchestrator, PendingQueue};
pub use models::{DiscoveredItem, FullArticle};
pub use proxy::ProxyRotator;
pub use source::{ListingItem, Source};
pub use storage::{ArticleStore, Repository};
pub use sync::{ErrorCollector, InFlightCounter, PoolError, TaskPool};
