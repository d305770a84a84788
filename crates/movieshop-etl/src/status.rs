//! Bronze status updater
//!
//! Conditional merge of a labeled silver batch back into its bronze table:
//! bronze rows whose match key appears in the batch and whose status is the
//! expected source status get the new status. Nothing else in bronze changes
//! and no rows are inserted.

use clap::ValueEnum;
use movieshop_common::{EtlError, RecordStatus, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::bronze::PAYLOAD_COLUMN;
use crate::canonical::canonical_string;
use crate::cast;
use crate::silver::SilverRecord;
use crate::table::{table_label, TableStore};

const STATUS_COLUMN: &str = "status";

/// How a silver row is matched to its bronze row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKey {
    /// The whole original payload, compared in canonical form
    #[default]
    Payload,
    /// The payload's `Id` cast to an integer
    MovieId,
}

impl MatchKey {
    /// Key of a payload; `None` never matches anything
    pub fn key_of(&self, payload: &Value) -> Option<String> {
        match self {
            MatchKey::Payload => Some(canonical_string(payload)),
            MatchKey::MovieId => cast::to_int(cast::field(payload, "Id")).map(|id| id.to_string()),
        }
    }
}

impl std::str::FromStr for MatchKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "payload" => Ok(MatchKey::Payload),
            "movie-id" | "movie_id" => Ok(MatchKey::MovieId),
            _ => Err(anyhow::anyhow!("Invalid match key: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKey::Payload => write!(f, "payload"),
            MatchKey::MovieId => write!(f, "movie-id"),
        }
    }
}

/// Outcome of a status merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    /// Bronze rows matched by the batch
    pub matched: usize,
    /// Matched rows whose status actually changed
    pub updated: usize,
    /// Table version committed, if anything was written
    pub version: Option<u64>,
}

pub struct StatusUpdater<'a> {
    store: &'a dyn TableStore,
    match_key: MatchKey,
}

impl<'a> StatusUpdater<'a> {
    pub fn new(store: &'a dyn TableStore, match_key: MatchKey) -> Self {
        Self { store, match_key }
    }

    pub fn match_key(&self) -> MatchKey {
        self.match_key
    }

    /// Match keys of a set of payloads; payloads without a key are skipped
    pub fn keys<'v>(&self, payloads: impl IntoIterator<Item = &'v Value>) -> HashSet<String> {
        payloads
            .into_iter()
            .filter_map(|payload| self.match_key.key_of(payload))
            .collect()
    }

    /// Move bronze rows matched by `batch` from status `from` to status `to`
    ///
    /// The transition is checked before bronze is read, so an invalid one
    /// leaves the table untouched. An empty batch or a merge that changes no
    /// row commits nothing.
    pub async fn update<T: SilverRecord>(
        &self,
        location: &Path,
        batch: &[T],
        from: RecordStatus,
        to: RecordStatus,
    ) -> Result<MergeSummary> {
        let keys = self.keys(batch.iter().map(|record| record.payload()));
        self.update_keys(location, &keys, from, to).await
    }

    /// Move bronze rows whose match key is in `keys` from `from` to `to`
    #[instrument(skip(self, keys), fields(table = %location.display(), keys = keys.len(), key = %self.match_key))]
    pub async fn update_keys(
        &self,
        location: &Path,
        keys: &HashSet<String>,
        from: RecordStatus,
        to: RecordStatus,
    ) -> Result<MergeSummary> {
        from.transition_to(to)?;

        if keys.is_empty() {
            debug!("No match keys in batch, skipping merge");
            return Ok(MergeSummary::default());
        }

        let label = table_label(location);
        let wrap = |e: EtlError| match e {
            EtlError::Update { .. } => e,
            other => EtlError::update(&label, other.to_string()),
        };

        let snapshot = self.store.snapshot(location).await.map_err(wrap)?;
        let read_version = snapshot.version;
        let mut rows = snapshot.rows;

        let mut summary = MergeSummary::default();
        for (index, row) in rows.iter_mut().enumerate() {
            let status: RecordStatus = row
                .get(STATUS_COLUMN)
                .and_then(|value| serde_json::from_value(value.clone()).ok())
                .ok_or_else(|| EtlError::update(&label, format!("row {} has no valid status", index)))?;
            if status != from {
                continue;
            }

            let matched = row
                .get(PAYLOAD_COLUMN)
                .and_then(|payload| self.match_key.key_of(payload))
                .is_some_and(|key| keys.contains(&key));
            if !matched {
                continue;
            }

            summary.matched += 1;
            if from != to {
                row.insert(STATUS_COLUMN.to_string(), Value::String(to.as_str().to_string()));
                summary.updated += 1;
            }
        }

        if summary.updated == 0 {
            debug!(matched = summary.matched, "Nothing to update");
            return Ok(summary);
        }

        let info = self.store.replace(location, read_version, rows).await.map_err(wrap)?;
        summary.version = Some(info.version);

        info!(
            from = %from,
            to = %to,
            matched = summary.matched,
            updated = summary.updated,
            version = info.version,
            "Updated bronze status"
        );
        Ok(summary)
    }
}
