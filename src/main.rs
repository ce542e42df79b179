//! # thumbdex CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `thumbdex init` | Create the SQLite database and schema |
//! | `thumbdex ingest <SRC>` | Rebuild the catalog from a directory and generate thumbnails |
//! | `thumbdex search "<query>"` | Comma-separated prefix search |
//! | `thumbdex get <FILENAME>` | Show one catalog record |
//! | `thumbdex stats` | Catalog and database sizes |
//! | `thumbdex serve [--src <SRC>]` | Start the HTTP server, optionally rebuilding first |
//!
//! ## Examples
//!
//! ```bash
//! thumbdex --config ./config/thumbdex.toml init
//! thumbdex ingest ~/gifs
//! thumbdex search "cat, dog"
//! thumbdex serve --src ~/gifs
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use thumbdex::config::{self, Config};
use thumbdex::ingest::{self, Ingestor};
use thumbdex::progress::ProgressMode;
use thumbdex::scheduler::ThumbnailScheduler;
use thumbdex::store::{CatalogStore, SqliteCatalog};
use thumbdex::thumbnail::ImageFrameExtractor;
use thumbdex::{get, migrate, search, server, stats};

/// thumbdex: a local media catalog with thumbnailing and prefix search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "thumbdex",
    about = "thumbdex: index a directory of images, generate thumbnails, search by filename tags",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/thumbdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Rebuild the catalog from a source directory.
    ///
    /// DESTRUCTIVE: the existing catalog is discarded first. Waits for all
    /// thumbnail jobs before exiting.
    Ingest {
        /// Directory of media files to index.
        src: PathBuf,

        /// Progress output on stderr (default: human when stderr is a TTY).
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search the catalog.
    ///
    /// Terms are comma separated; a file matches when one of its filename
    /// words starts with any term.
    Search {
        /// The search query string, e.g. "cat, dog".
        query: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the catalog record for a filename.
    Get {
        filename: String,
    },

    /// Show catalog statistics.
    Stats,

    /// Start the HTTP server.
    ///
    /// With `--src`, the catalog is rebuilt first; thumbnails keep
    /// generating in the background while the server runs.
    Serve {
        #[arg(long)]
        src: Option<PathBuf>,
    },
}

fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { src, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_ingest(&cfg, &src, mode).await?;
        }
        Commands::Search { query, json } => {
            search::run_search(&cfg, &query, json).await?;
        }
        Commands::Get { filename } => {
            get::run_get(&cfg, &filename).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve { src } => {
            let store = Arc::new(SqliteCatalog::connect(&cfg).await?);

            // Kept alive for the server's lifetime so background jobs finish.
            let _scheduler = match src {
                Some(src) => {
                    let scheduler = ThumbnailScheduler::spawn(
                        cfg.thumbnails.max_concurrent,
                        Arc::new(ImageFrameExtractor::new(cfg.thumbnails.size)),
                    );
                    let report = Ingestor::new(&cfg.catalog)?
                        .ingest(store.as_ref(), &scheduler, &src)
                        .await
                        .with_context(|| format!("ingest of {} failed", src.display()))?;
                    println!(
                        "Loaded {} files from {} ({} thumbnails unscheduled)",
                        report.inserted,
                        src.display(),
                        report.failed
                    );
                    Some(scheduler)
                }
                None => None,
            };

            println!("Catalog holds {} files", store.count().await?);
            server::run_server(&cfg, store).await?;
        }
    }

    Ok(())
}
