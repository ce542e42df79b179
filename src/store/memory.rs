//! In-memory [`CatalogStore`] implementation.
//!
//! Records live in a `Vec` behind a `std::sync::RwLock`, so insertion order
//! is the natural order and every query is a linear scan.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::MediaRecord;

use super::CatalogStore;

#[derive(Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<MediaRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn clear(&self) -> Result<()> {
        self.records.write().unwrap().clear();
        Ok(())
    }

    async fn insert_batch(&self, records: &[MediaRecord]) -> Result<u64> {
        self.records
            .write()
            .unwrap()
            .extend(records.iter().cloned());
        Ok(records.len() as u64)
    }

    async fn find_by_filename(&self, name: &str) -> Result<Option<MediaRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.iter().find(|r| r.filename == name).cloned())
    }

    async fn find_by_token_prefixes(&self, prefixes: &[String]) -> Result<Vec<MediaRecord>> {
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_lowercase()).collect();
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .filter(|r| prefixes.iter().any(|p| r.has_token_prefix(p)))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().unwrap().len() as u64)
    }
}
