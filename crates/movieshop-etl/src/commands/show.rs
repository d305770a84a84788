//! `movieshop-etl show` command implementation
//!
//! Prints rows of a registered table as JSON lines.

use movieshop_common::{RecordStatus, Result};
use serde_json::Value;

use crate::table::{Catalog, Row, TableStore};

/// Rows of `table`, optionally filtered by status, at most `limit` of them
pub async fn select(
    store: &dyn TableStore,
    catalog: &Catalog,
    table: &str,
    limit: usize,
    status: Option<RecordStatus>,
) -> Result<Vec<Row>> {
    let entry = catalog.resolve(table).await?;
    let snapshot = store.snapshot(&entry.location).await?;

    Ok(snapshot
        .rows
        .into_iter()
        .filter(|row| match status {
            Some(status) => row.get("status") == Some(&Value::String(status.to_string())),
            None => true,
        })
        .take(limit)
        .collect())
}

pub async fn run(
    store: &dyn TableStore,
    catalog: &Catalog,
    table: &str,
    limit: usize,
    status: Option<RecordStatus>,
) -> Result<()> {
    for row in select(store, catalog, table, limit, status).await? {
        println!("{}", serde_json::to_string(&row)?);
    }
    Ok(())
}
