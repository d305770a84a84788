//! `movieshop-etl run` command implementation

use movieshop_common::Result;

use crate::pipeline::Pipeline;
use crate::EntityArg;

/// Run the pipeline for each selected entity, in order
pub async fn run(pipeline: &Pipeline<'_>, entity: EntityArg, reset: bool) -> Result<()> {
    for entity in entity.entities() {
        let report = pipeline.run_entity(entity, reset).await?;

        println!("{}", entity.silver_table());
        println!("  Ingested:    {}", report.ingested);
        println!("  Processed:   {}", report.processed);
        println!("  Clean:       {}", report.clean);
        println!("  Quarantined: {}", report.quarantined);
        println!("  Silver rows: {}", report.silver_rows);
        println!();
    }
    Ok(())
}
