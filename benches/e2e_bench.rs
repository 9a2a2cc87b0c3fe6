//! End-to-end throughput: ingest a synthetic `scores` dump into sharded
//! Parquet, then materialize a warehouse from those shards (components
//! A-F chained).

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use score_warehouse::config::PipelineConfig;
use score_warehouse::error::Diagnostics;
use score_warehouse::ingest::ingest_file;
use score_warehouse::warehouse::Warehouse;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn generate_scores_dump(rows: usize) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("scores.sql");

    let mut data = String::new();
    data.push_str(
        "INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`pp`,`playmode`,`data`) VALUES ",
    );
    for i in 0..rows {
        if i > 0 {
            data.push(',');
        }
        data.push_str(&format!(
            "({i},{},{},{:.2},0,'{{\"mods\":[{{\"acronym\":\"HD\"}}]}}')",
            i % 5000,
            i % 800,
            100.0 + (i % 1000) as f64 / 10.0,
        ));
    }
    data.push_str(";\n");
    fs::write(&input_file, data).unwrap();

    (temp_dir, input_file)
}

fn bench_ingest_e2e(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_e2e");
    group.sample_size(10);

    for rows in [1_000, 10_000, 50_000] {
        let (_temp_dir, input_file) = generate_scores_dump(rows);
        let file_size = fs::metadata(&input_file).unwrap().len();

        group.throughput(Throughput::Bytes(file_size));
        group.bench_with_input(BenchmarkId::new("ingest", rows), &input_file, |b, input_file| {
            b.iter(|| {
                let shard_dir = TempDir::new().unwrap();
                let cfg = PipelineConfig::default();
                let diag = Arc::new(Diagnostics::new());
                ingest_file(input_file, "scores", shard_dir.path(), &cfg, diag, false).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_materialize_e2e(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_e2e");
    group.sample_size(10);

    for rows in [1_000, 10_000] {
        let (_temp_dir, input_file) = generate_scores_dump(rows);
        let shard_dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::default();
        let diag = Arc::new(Diagnostics::new());
        ingest_file(&input_file, "scores", shard_dir.path(), &cfg, diag, false).unwrap();

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_function(BenchmarkId::new("materialize", rows), |b| {
            b.iter(|| {
                let db_dir = TempDir::new().unwrap();
                let warehouse = Warehouse::open(&db_dir.path().join("warehouse.duckdb")).unwrap();
                warehouse.materialize(shard_dir.path()).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest_e2e, bench_materialize_e2e);
criterion_main!(benches);
