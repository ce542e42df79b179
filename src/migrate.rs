use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// `thumbdex init`: create the database file and schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema creation, also run whenever a catalog is opened.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Rowid order is the store's natural order for query results.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            source_path TEXT NOT NULL,
            thumbnail_path TEXT,
            size_bytes INTEGER NOT NULL,
            tokens_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per token occurrence; drives prefix search.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_tokens (
            media_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            token TEXT NOT NULL,
            PRIMARY KEY (media_id, position),
            FOREIGN KEY (media_id) REFERENCES media(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_filename ON media(filename)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_tokens_token ON media_tokens(token)")
        .execute(pool)
        .await?;

    Ok(())
}
