//! Raw-to-bronze transformation
//!
//! Bronze rows are the raw payload plus four lineage columns. Nothing is
//! dropped or rejected at this stage.

use chrono::{DateTime, NaiveDate, Utc};
use movieshop_common::RecordStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::raw::RawRecord;

/// Source tag stamped on every ingested record
pub const DEFAULT_DATA_SOURCE: &str = "movieshop_final_project";

/// Column holding the raw movie payload in bronze, and carried through silver
pub const PAYLOAD_COLUMN: &str = "movies";

/// Column names of a bronze table, in serialization order
pub const BRONZE_COLUMNS: [&str; 5] = [
    PAYLOAD_COLUMN,
    "data_source",
    "ingest_time",
    "ingest_date",
    "status",
];

/// One row of a bronze table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BronzeRecord {
    /// The raw record, untouched
    pub movies: Value,
    pub data_source: String,
    pub ingest_time: DateTime<Utc>,
    pub ingest_date: NaiveDate,
    pub status: RecordStatus,
}

/// Lineage stamped onto a batch at ingestion time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub data_source: String,
    pub ingest_time: DateTime<Utc>,
}

impl Lineage {
    pub fn new(data_source: impl Into<String>, ingest_time: DateTime<Utc>) -> Self {
        Self {
            data_source: data_source.into(),
            ingest_time,
        }
    }

    /// Lineage stamped with the current wall-clock time
    pub fn now(data_source: impl Into<String>) -> Self {
        Self::new(data_source, Utc::now())
    }

    pub fn ingest_date(&self) -> NaiveDate {
        self.ingest_time.date_naive()
    }
}

/// Stamp every raw record with lineage and status `new`
pub fn transform_raw(raw: Vec<RawRecord>, lineage: &Lineage) -> Vec<BronzeRecord> {
    let ingest_date = lineage.ingest_date();

    raw.into_iter()
        .map(|RawRecord(movies)| BronzeRecord {
            movies,
            data_source: lineage.data_source.clone(),
            ingest_time: lineage.ingest_time,
            ingest_date,
            status: RecordStatus::New,
        })
        .collect()
}

/// Keep only rows currently in `status`
pub fn with_status(rows: Vec<BronzeRecord>, status: RecordStatus) -> Vec<BronzeRecord> {
    rows.into_iter().filter(|row| row.status == status).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn lineage() -> Lineage {
        Lineage::new(
            DEFAULT_DATA_SOURCE,
            Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 30).unwrap(),
        )
    }

    #[test]
    fn test_adds_exactly_four_lineage_columns() {
        let raw = vec![RawRecord(json!({"Id": "5", "Title": "X", "Budget": 500000, "RunTime": 90}))];
        let bronze = transform_raw(raw.clone(), &lineage());

        assert_eq!(bronze.len(), 1);
        let row = serde_json::to_value(&bronze[0]).unwrap();
        let columns: BTreeSet<_> = row.as_object().unwrap().keys().cloned().collect();
        let expected: BTreeSet<_> = BRONZE_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert_eq!(columns, expected);
        assert_eq!(row["movies"], raw[0].0);
        assert_eq!(row["status"], json!("new"));
        assert_eq!(row["data_source"], json!("movieshop_final_project"));
        assert_eq!(row["ingest_date"], json!("2024-03-09"));
    }

    #[test]
    fn test_never_drops_rows() {
        let raw = vec![
            RawRecord(json!(null)),
            RawRecord(json!("not an object")),
            RawRecord(json!({"Id": 1})),
        ];
        let bronze = transform_raw(raw, &lineage());
        assert_eq!(bronze.len(), 3);
        assert!(bronze.iter().all(|r| r.status == RecordStatus::New));
    }

    #[test]
    fn test_with_status() {
        let mut bronze = transform_raw(
            vec![RawRecord(json!({"Id": 1})), RawRecord(json!({"Id": 2}))],
            &lineage(),
        );
        bronze[1].status = RecordStatus::Loaded;

        let fresh = with_status(bronze, RecordStatus::New);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].movies, json!({"Id": 1}));
    }
}
