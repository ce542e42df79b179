//! Core data models used throughout the catalog.
//!
//! [`MediaRecord`] is what the ingestion pipeline writes and the store
//! returns; [`SearchHit`] is the reduced shape handed to presentation.

use serde::Serialize;
use std::path::PathBuf;

/// One indexed media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRecord {
    /// Display name and lookup key. Not enforced unique.
    pub filename: String,
    pub source_path: PathBuf,
    /// Where the thumbnail is (or will be) written. The file may not exist
    /// if generation is still running or failed.
    pub thumbnail_path: Option<PathBuf>,
    /// Size of the source file when it was ingested.
    pub size_bytes: u64,
    pub tokens: Vec<String>,
}

impl MediaRecord {
    /// Does any token of this record start with `prefix`?
    pub fn has_token_prefix(&self, prefix: &str) -> bool {
        self.tokens.iter().any(|t| t.starts_with(prefix))
    }
}

/// A search result as rendered by callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub filename: String,
    pub size_bytes: u64,
    pub size_kb: u64,
    pub thumbnail: Option<PathBuf>,
}

impl From<&MediaRecord> for SearchHit {
    fn from(record: &MediaRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            size_bytes: record.size_bytes,
            size_kb: record.size_bytes / 1024,
            thumbnail: record.thumbnail_path.clone(),
        }
    }
}
