//! Query engine.
//!
//! A raw query such as `"Star, wars "` is split on commas, trimmed,
//! lowercased and stripped of empty terms. A record matches when any of its
//! tokens starts with any term. There is no ranking: hits come back in the
//! store's insertion order.
//!
//! A query with no usable terms is not "zero hits"; it yields
//! [`SearchOutcome::NoQuery`] so callers can show an empty search form.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::models::{MediaRecord, SearchHit};
use crate::store::{CatalogStore, SqliteCatalog};

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// No terms survived parsing. Carries the catalog size for display.
    NoQuery { catalog_size: u64 },
    Matches {
        terms: Vec<String>,
        records: Vec<MediaRecord>,
    },
}

impl SearchOutcome {
    pub fn is_no_query(&self) -> bool {
        matches!(self, SearchOutcome::NoQuery { .. })
    }

    pub fn records(&self) -> &[MediaRecord] {
        match self {
            SearchOutcome::NoQuery { .. } => &[],
            SearchOutcome::Matches { records, .. } => records,
        }
    }
}

/// JSON shape of a [`SearchOutcome`], shared by the CLI and HTTP server.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchResponse {
    NoQuery {
        catalog_size: u64,
    },
    Ok {
        terms: Vec<String>,
        count: usize,
        results: Vec<SearchHit>,
    },
}

impl From<&SearchOutcome> for SearchResponse {
    fn from(outcome: &SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::NoQuery { catalog_size } => SearchResponse::NoQuery {
                catalog_size: *catalog_size,
            },
            SearchOutcome::Matches { terms, records } => SearchResponse::Ok {
                terms: terms.clone(),
                count: records.len(),
                results: records.iter().map(SearchHit::from).collect(),
            },
        }
    }
}

/// Split a raw query into normalized search terms.
pub fn parse_query(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Run a raw query against `store`.
pub async fn search(store: &dyn CatalogStore, raw: &str) -> crate::error::Result<SearchOutcome> {
    let terms = parse_query(raw);
    if terms.is_empty() {
        return Ok(SearchOutcome::NoQuery {
            catalog_size: store.count().await?,
        });
    }

    let records = store.find_by_token_prefixes(&terms).await?;
    tracing::debug!(?terms, hits = records.len(), "search");

    Ok(SearchOutcome::Matches { terms, records })
}

/// `thumbdex search`: print hits, or the catalog size for an empty query.
pub async fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let store = SqliteCatalog::connect(config).await?;
    let outcome = search(&store, query).await?;
    store.close().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SearchResponse::from(&outcome))?
        );
        return Ok(());
    }

    match &outcome {
        SearchOutcome::NoQuery { catalog_size } => {
            println!("No query. {} files in the catalog.", catalog_size);
        }
        SearchOutcome::Matches { terms, records } => {
            if records.is_empty() {
                println!("No results for {}.", terms.join(", "));
                return Ok(());
            }
            println!("{} results for {}:", records.len(), terms.join(", "));
            for (i, record) in records.iter().enumerate() {
                println!(
                    "{}. {}  ({} KB)",
                    i + 1,
                    record.filename,
                    record.size_bytes / 1024
                );
            }
        }
    }

    Ok(())
}
