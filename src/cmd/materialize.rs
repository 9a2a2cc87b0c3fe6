use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::warehouse::Warehouse;

pub fn run(
    shard_dir: PathBuf,
    warehouse_dir: PathBuf,
    database_name: Option<String>,
    mut config: PipelineConfig,
) -> anyhow::Result<()> {
    config.warehouse_dir = warehouse_dir;
    if let Some(name) = database_name {
        config.database_name = name;
    }

    let db_path = config.database_path();
    let warehouse = Warehouse::open(&db_path)?;
    let manifest = warehouse.materialize(&shard_dir)?;

    for (table, rows) in &manifest.table_row_counts {
        log::info!("{table}: {rows} rows");
    }
    println!(
        "materialized {} tables into {}",
        manifest.table_row_counts.len(),
        db_path.display()
    );
    Ok(())
}
