//! SQLite-backed [`CatalogStore`] implementation.
//!
//! Records live in `media`; every token occurrence gets a row in
//! `media_tokens`, and prefix search is a `LIKE 'term%'` over that table
//! with `%`, `_` and `\` escaped so terms match literally.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::models::MediaRecord;

use super::CatalogStore;

const SELECT_MEDIA: &str =
    "SELECT m.filename, m.source_path, m.thumbnail_path, m.size_bytes, m.tokens_json FROM media m";

/// SQLite implementation of [`CatalogStore`].
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Wrap an open pool, creating the schema if it doesn't exist yet.
    pub async fn open(pool: SqlitePool) -> anyhow::Result<Self> {
        crate::migrate::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Connect to the database named in `config` and open the catalog.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        Self::open(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Escape `LIKE` metacharacters; pair with `ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_record(row: &SqliteRow) -> Result<MediaRecord> {
    let tokens_json: String = row.try_get("tokens_json")?;
    let source_path: String = row.try_get("source_path")?;
    let thumbnail_path: Option<String> = row.try_get("thumbnail_path")?;
    let size_bytes: i64 = row.try_get("size_bytes")?;

    Ok(MediaRecord {
        filename: row.try_get("filename")?,
        source_path: PathBuf::from(source_path),
        thumbnail_path: thumbnail_path.map(PathBuf::from),
        size_bytes: size_bytes.max(0) as u64,
        tokens: serde_json::from_str(&tokens_json)?,
    })
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM media_tokens")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM media").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_batch(&self, records: &[MediaRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let tokens_json = serde_json::to_string(&record.tokens)?;
            let media_id = sqlx::query(
                "INSERT INTO media (filename, source_path, thumbnail_path, size_bytes, tokens_json) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&record.filename)
            .bind(record.source_path.to_string_lossy().to_string())
            .bind(
                record
                    .thumbnail_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            )
            .bind(record.size_bytes as i64)
            .bind(&tokens_json)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for (position, token) in record.tokens.iter().enumerate() {
                sqlx::query("INSERT INTO media_tokens (media_id, position, token) VALUES (?, ?, ?)")
                    .bind(media_id)
                    .bind(position as i64)
                    .bind(token)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(records.len() as u64)
    }

    async fn find_by_filename(&self, name: &str) -> Result<Option<MediaRecord>> {
        let row = sqlx::query(&format!(
            "{} WHERE m.filename = ? ORDER BY m.id LIMIT 1",
            SELECT_MEDIA
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_token_prefixes(&self, prefixes: &[String]) -> Result<Vec<MediaRecord>> {
        if prefixes.is_empty() {
            return Ok(Vec::new());
        }

        let alternation = vec!["t.token LIKE ? ESCAPE '\\'"; prefixes.len()].join(" OR ");
        let sql = format!(
            "{} WHERE EXISTS (SELECT 1 FROM media_tokens t WHERE t.media_id = m.id AND ({})) ORDER BY m.id",
            SELECT_MEDIA, alternation
        );

        let mut query = sqlx::query(&sql);
        for prefix in prefixes {
            query = query.bind(format!("{}%", escape_like(&prefix.to_lowercase())));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
