//! Ingestion pipeline.
//!
//! Every run is a **full rebuild**: the existing catalog is discarded
//! before the source directory is scanned again. This is irreversible.
//!
//! Flow: check source → clear catalog → ensure workspace → list and stat
//! entries → submit one thumbnail job per entry → insert all records in one
//! batch → write the tag template. The batch insert does not wait for
//! thumbnails; records may point at thumbnail files that appear later, or
//! never, if their job fails.
//!
//! Workspace layout beneath the source directory:
//!
//! ```text
//! <src>/<workspace_dir>/
//! ├── thumbs/        # <filename>.jpg per indexed file
//! └── tags/
//!     └── README.txt # tagging convention for users
//! ```

use anyhow::{Context, Result};
use globset::GlobSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{CatalogConfig, Config};
use crate::error::CatalogError;
use crate::models::MediaRecord;
use crate::progress::{ProgressMode, ProgressEvent};
use crate::scheduler::ThumbnailScheduler;
use crate::store::{CatalogStore, SqliteCatalog};
use crate::thumbnail::{thumbnail_path_for, ImageFrameExtractor};
use crate::tokenize::tokenize;

pub const THUMBS_DIR: &str = "thumbs";
pub const TAGS_DIR: &str = "tags";
pub const TAG_TEMPLATE_FILE: &str = "README.txt";

const TAG_TEMPLATE: &str = "\
Tagging
=======

Every file in the parent directory is searchable by the words in its
name. Words are separated by '-' or '_' and matched case-insensitively
by prefix, so `Star-Wars_A_New_Hope.gif` is found by `star`, `wa`, `hope`.

To make a file easier to find, rename it to include more words:

    cat.gif  ->  cat-kitten-funny_fail.gif

Searches take a comma separated list of words and return files that
match any of them:

    cat, dog

Changes are picked up the next time the catalog is rebuilt.
";

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records written to the catalog.
    pub inserted: u64,
    /// Entries whose thumbnail job could not be handed to the scheduler.
    /// Thumbnail generation failures are reported by the scheduler instead.
    pub failed: u64,
}

/// Paths of the metadata workspace for one source directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub thumbs: PathBuf,
    pub tags: PathBuf,
}

impl Workspace {
    pub fn new(source_dir: &Path, name: &str) -> Self {
        let root = source_dir.join(name);
        Self {
            thumbs: root.join(THUMBS_DIR),
            tags: root.join(TAGS_DIR),
            root,
        }
    }

    /// Create the workspace directories; existing ones are fine.
    pub fn ensure(&self) -> Result<(), CatalogError> {
        std::fs::create_dir_all(&self.thumbs)?;
        std::fs::create_dir_all(&self.tags)?;
        Ok(())
    }

    pub fn tag_template_path(&self) -> PathBuf {
        self.tags.join(TAG_TEMPLATE_FILE)
    }
}

/// Rebuilds a catalog from a source directory.
pub struct Ingestor {
    workspace_dir: String,
    include: GlobSet,
}

impl Ingestor {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        Ok(Self {
            workspace_dir: config.workspace_dir.clone(),
            include: config.include_set()?,
        })
    }

    /// Run a full rebuild of `store` from `source_dir`.
    ///
    /// Fails with [`CatalogError::DirNotFound`] before touching anything if
    /// the source directory is missing. A failed `stat` on any entry aborts
    /// the run before records are inserted.
    pub async fn ingest(
        &self,
        store: &dyn CatalogStore,
        scheduler: &ThumbnailScheduler,
        source_dir: &Path,
    ) -> Result<IngestReport, CatalogError> {
        let source_dir = match std::fs::canonicalize(source_dir) {
            Ok(dir) if dir.is_dir() => dir,
            _ => return Err(CatalogError::DirNotFound(source_dir.to_path_buf())),
        };

        info!(source = %source_dir.display(), "rebuilding catalog");
        store.clear().await?;

        let workspace = Workspace::new(&source_dir, &self.workspace_dir);
        workspace.ensure()?;

        let entries = self.list_entries(&source_dir)?;
        debug!(count = entries.len(), "entries found");

        let mut records = Vec::with_capacity(entries.len());
        for (filename, path) in entries {
            let size_bytes = std::fs::metadata(&path)?.len();
            records.push(MediaRecord {
                tokens: tokenize(&filename),
                thumbnail_path: Some(thumbnail_path_for(&workspace.thumbs, &filename)),
                filename,
                source_path: path,
                size_bytes,
            });
        }

        let mut failed = 0u64;
        for record in &records {
            let Some(dest) = record.thumbnail_path.clone() else {
                continue;
            };
            if let Err(e) = scheduler.submit(record.source_path.clone(), dest) {
                warn!(file = %record.filename, "thumbnail not scheduled: {}", e);
                failed += 1;
            }
        }

        let inserted = store.insert_batch(&records).await?;

        std::fs::write(workspace.tag_template_path(), TAG_TEMPLATE)?;

        info!(inserted, failed, "catalog rebuilt");
        Ok(IngestReport { inserted, failed })
    }

    /// Immediate entries of `source_dir`, sorted by name, minus the
    /// workspace, directories and anything the include globs reject.
    fn list_entries(&self, source_dir: &Path) -> Result<Vec<(String, PathBuf)>, CatalogError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            let filename = entry.file_name().to_string_lossy().to_string();

            if filename == self.workspace_dir {
                continue;
            }
            if entry.file_type().is_dir() {
                debug!(dir = %filename, "skipping subdirectory");
                continue;
            }
            if !self.include.is_match(&filename) {
                continue;
            }

            entries.push((filename, entry.into_path()));
        }

        Ok(entries)
    }
}

fn walk_error(err: walkdir::Error) -> CatalogError {
    let message = err.to_string();
    match err.into_io_error() {
        Some(io) => CatalogError::Io(io),
        None => CatalogError::Io(std::io::Error::other(message)),
    }
}

/// `thumbdex ingest`: rebuild, then wait for thumbnails and report.
pub async fn run_ingest(config: &Config, source_dir: &Path, progress: ProgressMode) -> Result<()> {
    let store = SqliteCatalog::connect(config).await?;
    let scheduler = ThumbnailScheduler::spawn(
        config.thumbnails.max_concurrent,
        std::sync::Arc::new(ImageFrameExtractor::new(config.thumbnails.size)),
    );
    let ingestor = Ingestor::new(&config.catalog)?;

    let reporter = progress.reporter();
    reporter.report(ProgressEvent::Scanning {
        source: source_dir.display().to_string(),
    });

    let report = ingestor
        .ingest(&store, &scheduler, source_dir)
        .await
        .with_context(|| format!("ingest of {} failed", source_dir.display()))?;
    store.close().await;

    println!("ingest {}", source_dir.display());
    println!("  inserted: {}", report.inserted);
    println!("  unscheduled: {}", report.failed);

    let total = scheduler.submitted();
    let mut rx = scheduler.subscribe();
    let step = (total / 20).max(1);
    let mut last_reported = u64::MAX;
    while scheduler.stats().finished() < total {
        if rx.changed().await.is_err() {
            break;
        }
        let done = rx.borrow_and_update().finished();
        if done != last_reported && (done % step == 0 || done == total) {
            reporter.report(ProgressEvent::Thumbnails { done, total });
            last_reported = done;
        }
    }

    let stats = scheduler.drain().await;
    println!("  thumbnails ok: {}", stats.completed);
    println!("  thumbnails failed: {}", stats.failed);
    println!("ok");

    Ok(())
}
