//! Dataset providers.
//!
//! The engine only needs "give me every reference record" once per request;
//! this module defines that seam and two backends. The SQLite backend keeps
//! the `wifi_data` table layout the positioning clients already write to.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::utils::error::{Error, Result};
use crate::utils::types::{ReferenceRecord, SignalObservation};

#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Snapshot of every stored reference record, ordered by id.
    /// Fails with [`Error::StorageUnavailable`] on any backend failure.
    async fn fetch_all_records(&self) -> Result<Vec<ReferenceRecord>>;

    /// Store a new fingerprint under `label` and return its id.
    async fn insert_record(&self, label: &str, fingerprint: &[SignalObservation]) -> Result<i64>;
}

pub mod sqlite;

pub use sqlite::SqliteProvider;

/// In-memory provider, useful in tests or for a throwaway server.
#[derive(Default)]
pub struct MemoryProvider {
    records: RwLock<Vec<ReferenceRecord>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records; their ids are kept as-is.
    pub fn with_records(records: Vec<ReferenceRecord>) -> Self {
        Self { records: RwLock::new(records) }
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::StorageUnavailable("memory provider lock poisoned".to_string())
}

#[async_trait]
impl DatasetProvider for MemoryProvider {
    async fn fetch_all_records(&self) -> Result<Vec<ReferenceRecord>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }

    async fn insert_record(&self, label: &str, fingerprint: &[SignalObservation]) -> Result<i64> {
        let mut guard = self.records.write().map_err(poisoned)?;
        let id = guard.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        guard.push(ReferenceRecord::new(id, label, fingerprint.to_vec()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_assigns_sequential_ids() {
        let provider = MemoryProvider::new();
        let fp = vec![SignalObservation::new("w1", -40)];
        assert_eq!(provider.insert_record("hall", &fp).await.unwrap(), 1);
        assert_eq!(provider.insert_record("lab", &fp).await.unwrap(), 2);

        let records = provider.fetch_all_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].label, "lab");
        assert_eq!(records[1].fingerprint, fp);
    }

    #[tokio::test]
    async fn test_memory_provider_continues_after_seeded_ids() {
        let provider =
            MemoryProvider::with_records(vec![ReferenceRecord::new(41, "seed", Vec::new())]);
        assert_eq!(provider.insert_record("next", &[]).await.unwrap(), 42);
    }
}
