//! SQLite dataset provider using `rusqlite`.
//! Fingerprints are stored as JSON text in the `wifi_data` table.

use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::DatasetProvider;
use crate::utils::error::{Error, Result};
use crate::utils::types::{ReferenceRecord, SignalObservation};

/// Thread-safe SQLite wrapper shared across async tasks.
#[derive(Clone)]
pub struct SqliteProvider {
    conn: Arc<Mutex<Connection>>, // wrapped for async use via spawn_blocking
}

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::StorageUnavailable(e.to_string())
}

/// Default database location under the user data dir.
pub fn default_db_path() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("wifipos");
    p.push("fingerprints.db");
    p
}

impl SqliteProvider {
    /// Open (or create) the database file; `None` uses [`default_db_path`].
    pub async fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(default_db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening fingerprint database at {}", path.display());
        let conn = tokio::task::spawn_blocking(move || Connection::open(path))
            .await?
            .map_err(storage_err)?;
        init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| storage_err("sqlite connection lock poisoned"))?;
            f(&guard)
        })
        .await?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         CREATE TABLE IF NOT EXISTS wifi_data (
             id         INTEGER PRIMARY KEY AUTOINCREMENT,
             position   TEXT NOT NULL,
             wifi_data  TEXT NOT NULL
         );",
    )
    .map_err(storage_err)
}

#[async_trait]
impl DatasetProvider for SqliteProvider {
    async fn fetch_all_records(&self) -> Result<Vec<ReferenceRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, position, wifi_data FROM wifi_data ORDER BY id")
                .map_err(storage_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })
                .map_err(storage_err)?;

            let mut records = Vec::new();
            for row in rows {
                let (id, label, raw) = row.map_err(storage_err)?;
                let fingerprint: Vec<SignalObservation> =
                    serde_json::from_str(&raw).map_err(|e| {
                        storage_err(format!("record {} has malformed wifi_data: {}", id, e))
                    })?;
                records.push(ReferenceRecord { id, label, fingerprint });
            }
            debug!("fetched {} reference records", records.len());
            Ok(records)
        })
        .await
    }

    async fn insert_record(&self, label: &str, fingerprint: &[SignalObservation]) -> Result<i64> {
        let label = label.to_string();
        let raw = serde_json::to_string(fingerprint)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO wifi_data (position, wifi_data) VALUES (?1, ?2)",
                params![label, raw],
            )
            .map_err(storage_err)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let dir = tempdir().unwrap();
        let provider = SqliteProvider::open(Some(dir.path().join("fp.db"))).await.unwrap();

        let fp = vec![SignalObservation::new("aa:bb", -45), SignalObservation::new("cc:dd", -70)];
        let first = provider.insert_record("room-1", &fp).await.unwrap();
        let second = provider.insert_record("room-2", &fp[..1]).await.unwrap();
        assert!(second > first);

        let records = provider.fetch_all_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ReferenceRecord::new(first, "room-1", fp.clone()));
        assert_eq!(records[1].fingerprint.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_row_fails_fetch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fp.db");
        let provider = SqliteProvider::open(Some(path.clone())).await.unwrap();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "INSERT INTO wifi_data (position, wifi_data) VALUES ('broken', 'not json')",
                [],
            )
            .unwrap();
        }
        assert_matches!(provider.fetch_all_records().await, Err(Error::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fp.db");
        {
            let provider = SqliteProvider::open(Some(path.clone())).await.unwrap();
            provider.insert_record("kept", &[SignalObservation::new("w", -1)]).await.unwrap();
        }
        let provider = SqliteProvider::open(Some(path)).await.unwrap();
        assert_eq!(provider.fetch_all_records().await.unwrap()[0].label, "kept");
    }
}
