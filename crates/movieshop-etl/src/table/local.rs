//! Table store on the local filesystem

use async_trait::async_trait;
use chrono::Utc;
use movieshop_common::checksum::{sha256_hex, verify_sha256};
use movieshop_common::{EtlError, Result, WriteMode};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{table_label, CommitInfo, DataFile, Row, Snapshot, TableLog, TableStore};

/// Stores each table as a directory of JSON-lines files plus a table log
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTableStore;

impl LocalTableStore {
    pub fn new() -> Self {
        Self
    }

    async fn write_data_file(location: &Path, version: u64, rows: &[Row]) -> Result<DataFile> {
        let label = table_label(location);
        let mut content = String::new();
        for row in rows {
            content.push_str(&serde_json::to_string(row)?);
            content.push('\n');
        }

        let name = format!("part-{:05}-{}.jsonl", version, Uuid::new_v4());
        tokio::fs::create_dir_all(location)
            .await
            .map_err(|e| EtlError::write(&label, e.to_string()))?;
        tokio::fs::write(location.join(&name), content.as_bytes())
            .await
            .map_err(|e| EtlError::write(&label, e.to_string()))?;

        debug!(table = %label, file = %name, rows = rows.len(), "Wrote data file");
        Ok(DataFile {
            path: name,
            rows: rows.len(),
            checksum: sha256_hex(content.as_bytes()),
            added_at: Utc::now(),
        })
    }

    async fn read_data_file(location: &Path, file: &DataFile) -> Result<Vec<Row>> {
        let label = table_label(location);
        let bytes = tokio::fs::read(location.join(&file.path))
            .await
            .map_err(|e| EtlError::corrupt(&label, format!("missing data file {}: {}", file.path, e)))?;
        verify_sha256(&file.path, &bytes, &file.checksum)?;

        let content = std::str::from_utf8(&bytes)
            .map_err(|e| EtlError::corrupt(&label, format!("{}: {}", file.path, e)))?;

        let mut rows = Vec::with_capacity(file.rows);
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<Value>(line)? {
                Value::Object(row) => rows.push(row),
                _ => return Err(EtlError::corrupt(&label, format!("{}: row is not an object", file.path))),
            }
        }

        if rows.len() != file.rows {
            return Err(EtlError::corrupt(
                &label,
                format!("{}: expected {} rows, found {}", file.path, file.rows, rows.len()),
            ));
        }
        Ok(rows)
    }

    async fn commit(location: &Path, mut log: TableLog, rows: &[Row]) -> Result<CommitInfo> {
        log.version += 1;
        if !rows.is_empty() {
            let file = Self::write_data_file(location, log.version, rows).await?;
            log.files.push(file);
        }
        log.updated_at = Utc::now();
        log.save(location).await?;

        Ok(CommitInfo {
            version: log.version,
            rows_written: rows.len(),
            total_rows: log.row_count(),
        })
    }
}

/// Sorted column set shared by every row of a batch; `None` for an empty batch
fn batch_schema(label: &str, rows: &[Row]) -> Result<Option<Vec<String>>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let mut schema: Vec<String> = first.keys().cloned().collect();
    schema.sort();

    for row in rows {
        if row.len() != schema.len() || !schema.iter().all(|column| row.contains_key(column)) {
            return Err(EtlError::write(label, "rows in one batch have different columns"));
        }
    }
    Ok(Some(schema))
}

fn check_schema(label: &str, log: &TableLog, schema: &Option<Vec<String>>) -> Result<()> {
    match schema {
        Some(schema) if !log.schema.is_empty() && &log.schema != schema => Err(EtlError::SchemaMismatch {
            table: label.to_string(),
            expected: log.schema.clone(),
            actual: schema.clone(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl TableStore for LocalTableStore {
    #[instrument(skip(self), fields(table = %location.display()))]
    async fn snapshot(&self, location: &Path) -> Result<Snapshot> {
        let label = table_label(location);
        let log = TableLog::load(location)
            .await?
            .ok_or_else(|| EtlError::TableNotFound(label.clone()))?;

        let mut rows = Vec::with_capacity(log.row_count());
        for file in &log.files {
            rows.extend(Self::read_data_file(location, file).await?);
        }

        debug!(version = log.version, rows = rows.len(), "Read table snapshot");
        Ok(Snapshot {
            version: log.version,
            schema: log.schema,
            rows,
        })
    }

    #[instrument(skip(self, rows), fields(table = %location.display(), rows = rows.len()))]
    async fn write(&self, location: &Path, rows: Vec<Row>, mode: WriteMode) -> Result<CommitInfo> {
        let label = table_label(location);
        let schema = batch_schema(&label, &rows)?;

        let mut log = match (TableLog::load(location).await?, mode) {
            (Some(log), WriteMode::Append) => {
                check_schema(&label, &log, &schema)?;
                log
            },
            (Some(mut log), WriteMode::Overwrite) => {
                log.files.clear();
                log.schema.clear();
                log
            },
            (None, _) => TableLog::new(),
        };

        if let Some(schema) = schema {
            log.schema = schema;
        }

        let info = Self::commit(location, log, &rows).await?;
        info!(
            version = info.version,
            written = info.rows_written,
            total = info.total_rows,
            "Committed write"
        );
        Ok(info)
    }

    #[instrument(skip(self, rows), fields(table = %location.display(), rows = rows.len()))]
    async fn replace(&self, location: &Path, read_version: u64, rows: Vec<Row>) -> Result<CommitInfo> {
        let label = table_label(location);
        let mut log = TableLog::load(location)
            .await?
            .ok_or_else(|| EtlError::TableNotFound(label.clone()))?;

        if log.version != read_version {
            return Err(EtlError::write(
                &label,
                format!(
                    "table changed since version {} (now at version {})",
                    read_version, log.version
                ),
            ));
        }

        let schema = batch_schema(&label, &rows)?;
        check_schema(&label, &log, &schema)?;
        if let Some(schema) = schema {
            log.schema = schema;
        }
        log.files.clear();

        let info = Self::commit(location, log, &rows).await?;
        info!(version = info.version, total = info.total_rows, "Committed replace");
        Ok(info)
    }

    async fn exists(&self, location: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(TableLog::path(location)).await?)
    }

    #[instrument(skip(self), fields(table = %location.display()))]
    async fn remove(&self, location: &Path) -> Result<()> {
        if tokio::fs::try_exists(location).await? {
            tokio::fs::remove_dir_all(location).await?;
            info!("Removed table location");
        }
        Ok(())
    }
}
