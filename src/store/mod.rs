//! Catalog storage abstraction.
//!
//! The [`CatalogStore`] trait is everything the ingestion pipeline and the
//! query engine need from persistence. [`SqliteCatalog`] is the durable
//! backend; [`InMemoryCatalog`] backs tests and callers that don't need
//! restart durability.
//!
//! Filenames are not enforced unique: duplicates coexist and
//! [`find_by_filename`](CatalogStore::find_by_filename) returns the first
//! one inserted.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::MediaRecord;

pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;

/// Abstract catalog backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`clear`](CatalogStore::clear) | Discard every record (full rebuild) |
/// | [`insert_batch`](CatalogStore::insert_batch) | Append records in one call |
/// | [`find_by_filename`](CatalogStore::find_by_filename) | Exact filename lookup |
/// | [`find_by_token_prefixes`](CatalogStore::find_by_token_prefixes) | OR-of-prefixes token match |
/// | [`count`](CatalogStore::count) | Catalog size |
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Remove all records. Irreversible.
    async fn clear(&self) -> Result<()>;

    /// Append `records`, returning how many were stored.
    ///
    /// Either every record is stored or an error is returned; there is no
    /// partial-success count.
    async fn insert_batch(&self, records: &[MediaRecord]) -> Result<u64>;

    /// First record (in insertion order) whose filename equals `name`.
    async fn find_by_filename(&self, name: &str) -> Result<Option<MediaRecord>>;

    /// Records with at least one token starting with any of `prefixes`,
    /// in insertion order, each record at most once.
    ///
    /// Prefixes are matched literally and lowercased first, since tokens are
    /// always lowercase. An empty `prefixes` slice matches nothing.
    async fn find_by_token_prefixes(&self, prefixes: &[String]) -> Result<Vec<MediaRecord>>;

    async fn count(&self) -> Result<u64>;
}
