//! # thumbdex
//!
//! A local media catalog: indexes a directory of images, derives search
//! tokens from filenames, generates thumbnails with bounded concurrency and
//! serves prefix search plus file/thumbnail retrieval over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌──────────────┐
//! │ source dir │──▶│  Ingestor  │──▶│ CatalogStore │
//! └────────────┘   └─────┬──────┘   │   (SQLite)   │
//!                        │ submit   └──────┬───────┘
//!                        ▼                 │
//!                 ┌─────────────┐    ┌─────┴─────┐
//!                 │  Thumbnail  │    │  search   │
//!                 │  Scheduler  │    │  get      │
//!                 └─────────────┘    └─────┬─────┘
//!                                          ▼
//!                                   CLI / HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`tokenize`] | Filename → search tokens |
//! | [`store`] | Catalog storage trait and backends |
//! | [`thumbnail`] | First-frame thumbnail extraction |
//! | [`scheduler`] | Bounded-concurrency thumbnail job scheduling |
//! | [`ingest`] | Full-rebuild ingestion pipeline |
//! | [`search`] | Comma-separated prefix search |
//! | [`get`] | Filename validation and file lookup |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod error;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
pub mod thumbnail;
pub mod tokenize;
