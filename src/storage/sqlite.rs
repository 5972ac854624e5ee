//! SQLite storage implementation

use crate::models::{ArticleAuthor, ContentBlock, FullArticle, RelatedArticle};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, Repository, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed article repository
///
/// A single connection is shared behind a mutex; every statement is short, so
/// it is run inline rather than on a blocking thread.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRepository)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or apply the schema
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Checks whether `link` is stored
    pub fn contains(&self, link: &str) -> StorageResult<bool> {
        let conn = self.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM articles WHERE link = ?1",
                params![link],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts or replaces an article
    pub fn upsert(&self, article: &FullArticle) -> StorageResult<()> {
        let author_json = article
            .author
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let contents_json = serde_json::to_string(&article.contents)?;
        let related_json = serde_json::to_string(&article.related)?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO articles (
                link, source, headline, description, published_at, updated_at,
                author_json, contents_json, related_json, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(link) DO UPDATE SET
                source = excluded.source,
                headline = excluded.headline,
                description = excluded.description,
                published_at = excluded.published_at,
                updated_at = excluded.updated_at,
                author_json = excluded.author_json,
                contents_json = excluded.contents_json,
                related_json = excluded.related_json,
                stored_at = excluded.stored_at",
            params![
                article.link,
                article.source,
                article.headline,
                article.description,
                article.published_at.map(|t| t.to_rfc3339()),
                article.updated_at.map(|t| t.to_rfc3339()),
                author_json,
                contents_json,
                related_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Loads an article by link
    pub fn get_article(&self, link: &str) -> StorageResult<Option<FullArticle>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT source, headline, description, published_at, updated_at,
                        author_json, contents_json, related_json
                 FROM articles WHERE link = ?1",
                params![link],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((source, headline, description, published, updated, author, contents, related)) =
            row
        else {
            return Ok(None);
        };

        let author: Option<ArticleAuthor> =
            author.map(|a| serde_json::from_str(&a)).transpose()?;
        let contents: Vec<ContentBlock> = serde_json::from_str(&contents)?;
        let related: Vec<RelatedArticle> = serde_json::from_str(&related)?;

        Ok(Some(FullArticle {
            source,
            link: link.to_string(),
            headline,
            description,
            published_at: parse_timestamp("published_at", published)?,
            updated_at: parse_timestamp("updated_at", updated)?,
            author,
            contents,
            related,
        }))
    }

    /// Counts stored articles
    pub fn count_articles(&self) -> StorageResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts stored articles per source, sorted by source
    pub fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY source")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_timestamp(
    column: &'static str,
    value: Option<String>,
) -> StorageResult<Option<DateTime<Utc>>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| StorageError::InvalidValue { column, value: raw })
        })
        .transpose()
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn exists(&self, link: &str) -> StorageResult<bool> {
        self.contains(link)
    }
}

#[async_trait]
impl ArticleStore for SqliteRepository {
    async fn store(&self, article: &FullArticle) -> StorageResult<()> {
        self.upsert(article)
    }
}
