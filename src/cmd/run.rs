//! `run`: ingest then materialize in one invocation. With `--parallel`,
//! drives the chunk splitter and dispatcher (G) instead of reading the
//! source file directly; the grouped shard output and materialization step
//! are identical either way.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::PipelineConfig;
use crate::error::Diagnostics;
use crate::ingest::{ingest_chunk_file, ingest_file};
use crate::shard::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::chunk;
use crate::warehouse::Warehouse;

/// Shard-index slots reserved per chunk so concurrent writers sharing one
/// table directory never collide on `part-NNNNNN` names. Generous relative
/// to `chunk_rows / file_rows`, the expected shard files per chunk.
const SHARD_INDEX_SLOTS_PER_CHUNK: u64 = 100_000;

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    table: String,
    output: PathBuf,
    warehouse_dir: PathBuf,
    mut config: PipelineConfig,
    parallel: bool,
    progress: bool,
) -> anyhow::Result<()> {
    config.warehouse_dir = warehouse_dir;
    let diag = Arc::new(Diagnostics::new());

    let rows = if parallel {
        run_parallel(&file, &table, &output, &config, diag.clone())?
    } else {
        let (manifest, rows) = ingest_file(&file, &table, &output, &config, diag.clone(), progress)?;
        log::info!(
            "ingested {} rows for `{}` into {} file(s)",
            rows,
            table,
            manifest.files.len()
        );
        rows
    };

    let db_path = config.database_path();
    let warehouse = Warehouse::open(&db_path)?;
    let wh_manifest = warehouse.materialize(&output)?;
    for (table, count) in &wh_manifest.table_row_counts {
        log::info!("{table}: {count} rows");
    }

    println!(
        "ingested {rows} rows, materialized {} tables into {}",
        wh_manifest.table_row_counts.len(),
        db_path.display()
    );
    println!("{}", diag.snapshot());
    Ok(())
}

/// Plan a chunking strategy for `file`, split it into chunk dump files, and
/// dispatch one [`ingest_chunk_file`] task per chunk across a worker pool
/// (component G). Returns the total rows ingested.
fn run_parallel(
    file: &Path,
    table: &str,
    output: &Path,
    config: &PipelineConfig,
    diag: Arc<Diagnostics>,
) -> anyhow::Result<u64> {
    let byte_size = std::fs::metadata(file)?.len();
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let plan = chunk::plan(byte_size, cpu_count, &config.chunk_planner);
    log::info!(
        "chunk plan: {:?} class, {} rows/chunk, {} workers",
        plan.size_class,
        plan.chunk_rows,
        plan.worker_count
    );

    let chunk_workdir = tempfile::tempdir()?;
    let chunk_paths = chunk::split_into_chunks(file, table, chunk_workdir.path(), plan.chunk_rows)?;
    if chunk_paths.is_empty() {
        log::warn!("no rows found for table `{table}` in {}", file.display());
        return Ok(0);
    }

    let manifests: Mutex<Vec<Manifest>> = Mutex::new(Vec::new());
    let summary = chunk::dispatch(table, &chunk_paths, plan.worker_count, |path| {
        let start_index = chunk_index_from_path(path) * SHARD_INDEX_SLOTS_PER_CHUNK;
        let (manifest, rows) =
            ingest_chunk_file(path, table, output, config, diag.clone(), start_index)?;
        manifests.lock().unwrap().push(manifest);
        Ok(rows)
    })?;

    if summary.failed_chunks > 0 {
        for outcome in &summary.chunk_outcomes {
            if let Some(msg) = &outcome.error_message {
                diag.record_chunk_failure(&outcome.chunk_id.to_string(), &anyhow::anyhow!(msg.clone()));
            }
        }
    }

    let merged = Manifest::merge(table, manifests.into_inner().unwrap());
    let table_dir = output.join(table);
    std::fs::create_dir_all(&table_dir)?;
    std::fs::write(table_dir.join(MANIFEST_FILE_NAME), merged.to_json_pretty()?)?;

    Ok(summary.total_rows)
}

fn chunk_index_from_path(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0)
}
