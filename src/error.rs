//! Error taxonomy for the catalog core.
//!
//! Pipeline-level failures ([`CatalogError::DirNotFound`],
//! [`CatalogError::StoreIo`]) abort the whole operation. Per-item thumbnail
//! failures are carried by [`ThumbnailError`](crate::thumbnail::ThumbnailError)
//! and only ever logged by the scheduler.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("source directory does not exist: {}", .0.display())]
    DirNotFound(PathBuf),
    #[error("thumbnail generation failed for {}: {reason}", .source_path.display())]
    ThumbnailGeneration {
        source_path: PathBuf,
        reason: String,
    },
    #[error("catalog store error: {0}")]
    StoreIo(#[from] sqlx::Error),
    #[error("there was an i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize record tokens: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid filename: {0}")]
    InvalidFilename(String),
    #[error("thumbnail scheduler is no longer running")]
    SchedulerClosed,
}
