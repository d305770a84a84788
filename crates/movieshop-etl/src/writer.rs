//! Batch writer
//!
//! Serializes a batch of records into table rows, drops excluded columns and
//! commits the rows through a [`TableStore`]. Schema checks belong to the
//! store.

use movieshop_common::{EtlError, Result, WriteMode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument};

use crate::table::{table_label, CommitInfo, Row, TableStore};

#[derive(Debug, Clone, Default)]
pub struct BatchWriter {
    exclude_columns: BTreeSet<String>,
    mode: WriteMode,
}

impl BatchWriter {
    /// Writer that appends every column
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Serialize records to rows without the excluded columns
    pub fn to_rows<T: Serialize>(&self, batch: &[T]) -> Result<Vec<Row>> {
        batch
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(mut row) => {
                    for column in &self.exclude_columns {
                        row.remove(column);
                    }
                    Ok(row)
                },
                other => Err(EtlError::write(
                    "batch",
                    format!("record does not serialize to an object: {}", other),
                )),
            })
            .collect()
    }

    /// Persist the batch to the table at `location`
    #[instrument(skip_all, fields(table = %location.display(), rows = batch.len(), mode = %self.mode))]
    pub async fn save<T: Serialize + Sync>(
        &self,
        store: &dyn TableStore,
        location: &Path,
        batch: &[T],
    ) -> Result<CommitInfo> {
        let rows = self.to_rows(batch).map_err(|e| match e {
            EtlError::Write { reason, .. } => EtlError::write(table_label(location), reason),
            other => other,
        })?;

        let info = store.write(location, rows, self.mode).await?;
        info!(version = info.version, total = info.total_rows, "Saved batch");
        Ok(info)
    }
}
