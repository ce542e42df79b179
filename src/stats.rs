//! Catalog statistics.
//!
//! `thumbdex stats` prints the catalog size, the database file size and how
//! many recorded thumbnails actually exist on disk.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::store::{CatalogStore, SqliteCatalog};

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub files: u64,
    pub total_bytes: u64,
    pub thumbnails_present: u64,
    pub thumbnails_missing: u64,
    pub db_bytes: u64,
}

pub async fn collect_stats(config: &Config, store: &SqliteCatalog) -> Result<CatalogStats> {
    let files = store.count().await?;

    let total_bytes: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(size_bytes), 0) FROM media")
        .fetch_one(store.pool())
        .await?;

    let thumb_paths: Vec<Option<String>> = sqlx::query_scalar("SELECT thumbnail_path FROM media")
        .fetch_all(store.pool())
        .await?;
    let thumbnails_present = thumb_paths
        .iter()
        .flatten()
        .filter(|p| std::path::Path::new(p).exists())
        .count() as u64;

    let db_bytes = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(CatalogStats {
        files,
        total_bytes: total_bytes.max(0) as u64,
        thumbnails_present,
        thumbnails_missing: files.saturating_sub(thumbnails_present),
        db_bytes,
    })
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteCatalog::connect(config).await?;
    let stats = collect_stats(config, &store).await?;
    store.close().await;

    println!("Catalog Stats");
    println!("=============");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(stats.db_bytes));
    println!();
    println!("  Files:       {}", stats.files);
    println!("  Media size:  {}", format_bytes(stats.total_bytes));
    println!(
        "  Thumbnails:  {} present, {} missing",
        stats.thumbnails_present, stats.thumbnails_missing
    );
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
