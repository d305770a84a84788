//! `movieshop-etl tables` command implementation

use movieshop_common::Result;

use crate::table::Catalog;

/// List registered tables and their locations
pub async fn run(catalog: &Catalog) -> Result<()> {
    let tables = catalog.tables().await?;

    if tables.is_empty() {
        println!("No tables registered.");
        println!("Run 'movieshop-etl run' to build them.");
        return Ok(());
    }

    for (name, entry) in &tables {
        println!("{:<28} {}", name, entry.location.display());
    }
    Ok(())
}
