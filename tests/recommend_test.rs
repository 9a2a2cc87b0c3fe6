//! End-to-end coverage of the recommender contract against a warehouse
//! materialized from a small synthetic `scores` dump: cohort selection,
//! the session-scoped cohort cache, and candidate scoring.

use score_warehouse::config::PipelineConfig;
use score_warehouse::error::Diagnostics;
use score_warehouse::ingest::ingest_file;
use score_warehouse::recommend::{cohort_users, recommendations, CohortCache};
use score_warehouse::warehouse::Warehouse;
use std::sync::Arc;
use tempfile::TempDir;

fn write_scores_dump(path: &std::path::Path) {
    std::fs::write(
        path,
        br#"INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`score`,`pp`,`playmode`,`data`) VALUES
(1,101,201,900000,500.0,0,'{}'),
(2,102,201,880000,480.0,0,'{}'),
(3,103,201,910000,510.0,0,'{}'),
(4,101,301,860000,450.0,0,'{}'),
(5,102,301,870000,460.0,0,'{}'),
(6,104,301,880000,470.0,0,'{}'),
(7,105,301,850000,440.0,0,'{}'),
(8,106,401,800000,400.0,0,'{}');"#,
    )
    .unwrap();
}

fn materialized_warehouse(dir: &TempDir) -> Warehouse {
    let dump_path = dir.path().join("scores.sql");
    write_scores_dump(&dump_path);

    let shard_dir = dir.path().join("shards");
    let cfg = PipelineConfig::default();
    let diag = Arc::new(Diagnostics::new());
    ingest_file(&dump_path, "scores", &shard_dir, &cfg, diag, false).unwrap();

    let warehouse = Warehouse::open(&dir.path().join("warehouse.duckdb")).unwrap();
    warehouse.materialize(&shard_dir).unwrap();
    warehouse
}

#[test]
fn cohort_and_recommendations_score_candidate_beatmaps() {
    let dir = TempDir::new().unwrap();
    let warehouse = materialized_warehouse(&dir);
    let conn = warehouse.connection();

    let mut cohort = cohort_users(conn, 201, None, None, None).unwrap();
    cohort.sort();
    assert_eq!(cohort, vec![101, 102, 103]);

    let cache = CohortCache::create(conn, &cohort).unwrap();

    // beatmap 401 only has one player and fails the popularity floor.
    let recs = recommendations(conn, &cache, 1, 2, 10).unwrap();
    assert_eq!(recs.len(), 2);

    // 201 is the seed itself (full self-overlap, zero novelty); 301 overlaps
    // on users 101/102 only, so it ranks second with positive novelty.
    assert_eq!(recs[0].beatmap_id, 201);
    assert_eq!(recs[0].cohort_overlap, 3);
    assert!((recs[0].novelty_score - 0.0).abs() < 1e-9);

    assert_eq!(recs[1].beatmap_id, 301);
    assert_eq!(recs[1].cohort_overlap, 2);
    assert_eq!(recs[1].total_players, 4);
    assert!((recs[1].novelty_score - 0.5).abs() < 1e-9);
}

#[test]
fn popularity_floor_excludes_thin_candidates() {
    let dir = TempDir::new().unwrap();
    let warehouse = materialized_warehouse(&dir);
    let conn = warehouse.connection();

    let cohort = cohort_users(conn, 201, None, None, None).unwrap();
    let cache = CohortCache::create(conn, &cohort).unwrap();

    // Raising min_total_players past beatmap 401's single player excludes it
    // even with min_cohort_overlap at zero.
    let recs = recommendations(conn, &cache, 0, 2, 10).unwrap();
    assert!(recs.iter().all(|r| r.beatmap_id != 401));
}
