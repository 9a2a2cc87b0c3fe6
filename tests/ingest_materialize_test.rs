//! End-to-end coverage of ingest -> materialize against a small synthetic
//! `scores` dump, exercising the full bronze -> silver -> gold chain.

use score_warehouse::config::PipelineConfig;
use score_warehouse::error::Diagnostics;
use score_warehouse::ingest::ingest_file;
use score_warehouse::warehouse::Warehouse;
use std::sync::Arc;
use tempfile::TempDir;

fn write_scores_dump(path: &std::path::Path) {
    std::fs::write(
        path,
        br#"INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`score`,`pp`,`playmode`,`data`) VALUES
(1,101,201,900000,520.5,0,'{"mods":[{"acronym":"HR"},{"acronym":"DT"}]}'),
(2,101,201,880000,480.0,0,'{"mods":[{"acronym":"HR"}]}'),
(3,102,201,910000,500.0,0,'{"mods":[{"acronym":"DT"}]}'),
(4,103,202,800000,300.0,0,'{"mods":[]}'),
(5,101,202,700000,260.0,1,'{"mods":[]}');"#,
    )
    .unwrap();
}

#[test]
fn full_pipeline_produces_expected_gold_tables() {
    let dir = TempDir::new().unwrap();
    let dump_path = dir.path().join("scores.sql");
    write_scores_dump(&dump_path);

    let shard_dir = dir.path().join("shards");
    let cfg = PipelineConfig::default();
    let diag = Arc::new(Diagnostics::new());
    let (manifest, rows) =
        ingest_file(&dump_path, "scores", &shard_dir, &cfg, diag, false).unwrap();
    assert_eq!(rows, 5);
    assert_eq!(manifest.total_rows, 5);

    let warehouse = Warehouse::open(&dir.path().join("warehouse.duckdb")).unwrap();
    let wh_manifest = warehouse.materialize(&shard_dir).unwrap();
    let counts: std::collections::HashMap<_, _> = wh_manifest.table_row_counts.into_iter().collect();

    // playmode = 1 row (id 5) is filtered by stg_scores.
    assert_eq!(counts["stg_scores"], 4);

    // best-scores dedups (user_id, beatmap_id, mods_key): rows 1 and 3 share
    // beatmap 201 but different mods_key (HR,DT vs DT), row 2 is its own
    // mods_key (HR) for the same user/beatmap as row 1 -> all three survive.
    assert_eq!(counts["mart_best_scores"], 4);

    let conn = warehouse.connection();
    let beatmap_count: i64 = conn
        .query_row(
            "SELECT COUNT(DISTINCT beatmap_id) FROM mart_beatmap_user_sets",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(beatmap_count, 2);
}

#[test]
fn empty_dump_materializes_without_error() {
    let dir = TempDir::new().unwrap();
    let dump_path = dir.path().join("scores.sql");
    std::fs::write(&dump_path, b"INSERT INTO `other_table` VALUES (1,'x');").unwrap();

    let shard_dir = dir.path().join("shards");
    let cfg = PipelineConfig::default();
    let diag = Arc::new(Diagnostics::new());
    let (manifest, rows) =
        ingest_file(&dump_path, "scores", &shard_dir, &cfg, diag, false).unwrap();
    assert_eq!(rows, 0);
    assert!(manifest.files.is_empty());

    let warehouse = Warehouse::open(&dir.path().join("warehouse.duckdb")).unwrap();
    let wh_manifest = warehouse.materialize(&shard_dir).unwrap();
    assert!(wh_manifest.table_row_counts.iter().all(|(_, n)| *n == 0));
}
