//! Table log (`_table_log.json`)
//!
//! The log records the table version, its column set and the data files that
//! make up the current version.

use chrono::{DateTime, Utc};
use movieshop_common::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{table_label, write_atomic};

/// File name of the log inside a table location
pub const LOG_FILE: &str = "_table_log.json";

/// Log format version understood by this build
pub const LOG_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableLog {
    pub format_version: u32,

    /// Incremented by every commit
    pub version: u64,

    /// Sorted column names; empty until the first non-empty write
    pub schema: Vec<String>,

    /// Live data files, in commit order
    pub files: Vec<DataFile>,

    pub updated_at: DateTime<Utc>,
}

/// One immutable JSON-lines data file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataFile {
    /// Path relative to the table location
    pub path: String,
    pub rows: usize,
    /// SHA-256 of the file contents
    pub checksum: String,
    pub added_at: DateTime<Utc>,
}

impl TableLog {
    pub fn new() -> Self {
        Self {
            format_version: LOG_FORMAT_VERSION,
            version: 0,
            schema: Vec::new(),
            files: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn path(location: &Path) -> PathBuf {
        location.join(LOG_FILE)
    }

    /// Load the log of a table, or `None` if the location holds no table
    pub async fn load(location: &Path) -> Result<Option<Self>> {
        let path = Self::path(location);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let log: TableLog = serde_json::from_str(&content)
            .map_err(|e| EtlError::corrupt(table_label(location), format!("unreadable log: {}", e)))?;

        if log.format_version != LOG_FORMAT_VERSION {
            return Err(EtlError::corrupt(
                table_label(location),
                format!("unsupported log format version {}", log.format_version),
            ));
        }

        Ok(Some(log))
    }

    /// Atomically persist the log
    pub async fn save(&self, location: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(&Self::path(location), content.as_bytes())
            .await
            .map_err(|e| EtlError::write(table_label(location), e.to_string()))
    }

    /// Total rows across live data files
    pub fn row_count(&self) -> usize {
        self.files.iter().map(|file| file.rows).sum()
    }
}

impl Default for TableLog {
    fn default() -> Self {
        Self::new()
    }
}
