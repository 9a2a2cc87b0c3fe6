//! `recommend`: smoke-test the recommender contract against an
//! already-materialized warehouse.

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::recommend::{cohort_users, recommendations, CohortCache};
use crate::warehouse::Warehouse;

#[allow(clippy::too_many_arguments)]
pub fn run(
    warehouse_dir: PathBuf,
    database_name: Option<String>,
    mut config: PipelineConfig,
    beatmap_id: i64,
    mods_key: Option<String>,
    min_overlap: i64,
    min_players: i64,
    limit: i64,
) -> anyhow::Result<()> {
    config.warehouse_dir = warehouse_dir;
    if let Some(name) = database_name {
        config.database_name = name;
    }

    let db_path = config.database_path();
    let warehouse = Warehouse::open(&db_path)?;
    let conn = warehouse.connection();

    let users = cohort_users(conn, beatmap_id, mods_key.as_deref(), None, None)?;
    log::info!("cohort for beatmap {beatmap_id}: {} users", users.len());

    let cache = CohortCache::create(conn, &users)?;
    let recs = recommendations(conn, &cache, min_overlap, min_players, limit)?;

    println!("{}", serde_json::to_string_pretty(&recs)?);
    Ok(())
}
