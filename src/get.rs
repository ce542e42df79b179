//! File and thumbnail retrieval by filename.
//!
//! Filenames arriving from outside (HTTP paths, CLI arguments) are
//! validated before lookup: a stem of ASCII letters, digits, `-` and `_`,
//! then a known extension. Anything else, including path separators and
//! `..`, is rejected with [`CatalogError::InvalidFilename`].

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::CatalogError;
use crate::models::MediaRecord;
use crate::store::{CatalogStore, SqliteCatalog};
use crate::tokenize::KNOWN_EXTENSIONS;

/// Which file of a record the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Original,
    Thumbnail,
}

pub fn validate_filename(name: &str) -> Result<(), CatalogError> {
    let invalid = || CatalogError::InvalidFilename(name.to_string());

    let (stem, ext) = name.rsplit_once('.').ok_or_else(invalid)?;
    let stem_ok = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let ext_ok = KNOWN_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext));

    if stem_ok && ext_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Validate `name`, look it up and return the path of the requested file.
///
/// The path is what the catalog recorded; a thumbnail path may not exist
/// on disk if its job failed or hasn't finished.
pub async fn resolve_path(
    store: &dyn CatalogStore,
    name: &str,
    kind: FileKind,
) -> Result<PathBuf, CatalogError> {
    validate_filename(name)?;

    let record = store
        .find_by_filename(name)
        .await?
        .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

    match kind {
        FileKind::Original => Ok(record.source_path),
        FileKind::Thumbnail => record
            .thumbnail_path
            .ok_or_else(|| CatalogError::NotFound(format!("thumbnail for {}", name))),
    }
}

/// Validate `name` and fetch its full record.
pub async fn get_record(
    store: &dyn CatalogStore,
    name: &str,
) -> Result<MediaRecord, CatalogError> {
    validate_filename(name)?;
    store
        .find_by_filename(name)
        .await?
        .ok_or_else(|| CatalogError::NotFound(name.to_string()))
}

/// `thumbdex get`: print one record.
pub async fn run_get(config: &Config, name: &str) -> Result<()> {
    let store = SqliteCatalog::connect(config).await?;
    let result = get_record(&store, name).await;
    store.close().await;

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let thumb_status = match &record.thumbnail_path {
        Some(path) if path.exists() => path.display().to_string(),
        Some(path) => format!("{} (missing)", path.display()),
        None => "(none)".to_string(),
    };

    println!("filename:   {}", record.filename);
    println!("path:       {}", record.source_path.display());
    println!("thumbnail:  {}", thumb_status);
    println!("size:       {} bytes ({} KB)", record.size_bytes, record.size_bytes / 1024);
    println!("tokens:     {}", record.tokens.join(", "));

    Ok(())
}
