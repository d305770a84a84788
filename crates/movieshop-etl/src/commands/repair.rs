//! `movieshop-etl repair-quarantine` command implementation

use movieshop_common::Result;

use crate::pipeline::Pipeline;
use crate::EntityArg;

pub async fn run(pipeline: &Pipeline<'_>, entity: EntityArg) -> Result<()> {
    for entity in entity.entities() {
        let report = pipeline.repair_entity(entity).await?;

        println!("{}", entity.bronze_table());
        println!("  Reprocessed:       {}", report.reprocessed);
        println!("  Repaired:          {}", report.repaired);
        println!("  Still quarantined: {}", report.still_quarantined);
        println!();
    }
    Ok(())
}
