//! Storage traits and error types

use crate::models::FullArticle;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Existence lookups for previously processed articles
///
/// Implementations must be safe to call from many discovery jobs at once.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Reports whether an article with this canonical link is already known
    async fn exists(&self, link: &str) -> StorageResult<bool>;
}

/// Persistence for retrieved articles
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Stores an article, replacing any previous version with the same link
    async fn store(&self, article: &FullArticle) -> StorageResult<()>;
}
