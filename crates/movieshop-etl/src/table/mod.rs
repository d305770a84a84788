//! Transactional table storage
//!
//! A table is a directory holding immutable JSON-lines data files and a
//! [`TableLog`] that names the live files. A commit writes any new data file
//! first and then atomically replaces the log, so readers only ever see whole
//! versions.

pub mod catalog;
pub mod local;
pub mod log;

pub use catalog::{Catalog, CatalogEntry};
pub use local::LocalTableStore;
pub use log::{DataFile, TableLog};

use async_trait::async_trait;
use movieshop_common::{Result, WriteMode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// One table row keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Rows of a table as of one version
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub schema: Vec<String>,
    pub rows: Vec<Row>,
}

impl Snapshot {
    /// Deserialize every row into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.rows
            .iter()
            .map(|row| Ok(serde_json::from_value(Value::Object(row.clone()))?))
            .collect()
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    pub version: u64,
    pub rows_written: usize,
    pub total_rows: usize,
}

/// Storage for versioned tables addressed by location
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Read the current version of a table
    async fn snapshot(&self, location: &Path) -> Result<Snapshot>;

    /// Append or overwrite rows
    ///
    /// Appending rows whose columns differ from the table schema fails with
    /// `EtlError::SchemaMismatch`.
    async fn write(&self, location: &Path, rows: Vec<Row>, mode: WriteMode) -> Result<CommitInfo>;

    /// Replace every row, provided the table is still at `read_version`
    async fn replace(&self, location: &Path, read_version: u64, rows: Vec<Row>) -> Result<CommitInfo>;

    async fn exists(&self, location: &Path) -> Result<bool>;

    /// Delete the table and all of its files
    async fn remove(&self, location: &Path) -> Result<()>;
}

/// Read and decode a whole table
pub async fn read_table<T: DeserializeOwned>(store: &dyn TableStore, location: &Path) -> Result<Vec<T>> {
    store.snapshot(location).await?.decode()
}

/// Write `bytes` next to `path` and rename it into place
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

pub(crate) fn table_label(location: &Path) -> String {
    location.display().to_string()
}
