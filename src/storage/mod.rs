//! Storage module for known articles
//!
//! This module answers "have we seen this link before?" for the crawler and
//! persists retrieved articles:
//! - `Repository`: existence lookups by canonical link
//! - `ArticleStore`: persisting fully retrieved articles
//! - `SqliteRepository`: SQLite-backed implementation of both

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{ArticleStore, Repository, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the article database at `path`
pub fn open_repository(path: &Path) -> StorageResult<SqliteRepository> {
    SqliteRepository::open(path)
}
