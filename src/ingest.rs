//! Per-file ingest glue (A→B→C→D→E): opens one dump file, scans it for a
//! target table, builds columnar batches, and writes a sharded output
//! directory with manifest. This is the single-threaded unit of work the
//! `ingest` CLI subcommand runs directly and the chunk driver (G) runs once
//! per chunk path when horizontal scaling is requested.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::batch::BatchBuilder;
use crate::compress::Compression;
use crate::config::PipelineConfig;
use crate::error::Diagnostics;
use crate::progress::ProgressReader;
use crate::scanner::Scanner;
use crate::shard::manifest::Manifest;
use crate::shard::ShardWriter;

/// Ingest one dump file for `table`, writing shards under
/// `shard_dir`/`table`. Returns the finalized manifest and the number of
/// rows the scanner recognized (for the chunk driver's `rows_processed`
/// outcome field).
pub fn ingest_file(
    input_path: &Path,
    table: &str,
    shard_dir: &Path,
    cfg: &PipelineConfig,
    diag: Arc<Diagnostics>,
    show_progress: bool,
) -> anyhow::Result<(Manifest, u64)> {
    let (writer, rows_seen) =
        ingest_file_impl(input_path, table, shard_dir, cfg, diag, show_progress, 0)?;
    let manifest = writer.finalize()?;
    Ok((manifest, rows_seen))
}

/// Same as [`ingest_file`] but numbers shard files from `shard_start_index`
/// and never shows a progress bar, and returns the manifest without writing
/// `manifest.json`. Used by the parallel chunk driver (G), where several
/// chunks of the same table are ingested concurrently into one shared shard
/// directory: each worker needs a disjoint slice of the `part-NNNNNN`
/// namespace, and only the caller that has collected every chunk's manifest
/// should write the merged `manifest.json`.
pub fn ingest_chunk_file(
    input_path: &Path,
    table: &str,
    shard_dir: &Path,
    cfg: &PipelineConfig,
    diag: Arc<Diagnostics>,
    shard_start_index: u64,
) -> anyhow::Result<(Manifest, u64)> {
    let (writer, rows_seen) = ingest_file_impl(
        input_path,
        table,
        shard_dir,
        cfg,
        diag,
        false,
        shard_start_index,
    )?;
    let manifest = writer.close()?;
    Ok((manifest, rows_seen))
}

#[allow(clippy::too_many_arguments)]
fn ingest_file_impl(
    input_path: &Path,
    table: &str,
    shard_dir: &Path,
    cfg: &PipelineConfig,
    diag: Arc<Diagnostics>,
    show_progress: bool,
    shard_start_index: u64,
) -> anyhow::Result<(ShardWriter, u64)> {
    let file = File::open(input_path)
        .map_err(|source| crate::error::PipelineError::IoFatal {
            path: input_path.to_path_buf(),
            source,
        })?;
    let compression = Compression::from_path(input_path);
    let total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);

    let bar = show_progress.then(|| {
        let bar = indicatif::ProgressBar::new(total_bytes);
        bar.set_style(
            indicatif::ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap(),
        );
        bar
    });

    let reader: Box<dyn std::io::Read> = compression.wrap_reader(Box::new(file));
    let reader: Box<dyn std::io::Read> = match &bar {
        Some(bar) => {
            let bar = bar.clone();
            Box::new(ProgressReader::new(reader, move |n| bar.set_position(n)))
        }
        None => reader,
    };

    let table_dir = shard_dir.join(table);
    let mut scanner = Scanner::new(reader, table);
    let mut writer = ShardWriter::with_start_index(
        &table_dir,
        table,
        cfg.file_rows,
        cfg.row_group_rows,
        &cfg.compression,
        shard_start_index,
    )?;

    let mut rows_seen: u64 = 0;
    let first_row = scanner.next_row(&diag)?;
    let columns = scanner.columns.clone();
    let data_col_idx = scanner.data_col_idx();
    let mut builder = BatchBuilder::new(columns, data_col_idx, cfg.batch_rows, diag.clone());

    let mut row = first_row;
    while let Some(r) = row {
        rows_seen += 1;
        if let Some(batch) = builder.push(r) {
            writer.write_batch(&batch)?;
        }
        row = scanner.next_row(&diag)?;
    }

    let final_batch = builder.finish();
    if final_batch.num_rows() > 0 {
        writer.write_batch(&final_batch)?;
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok((writer, rows_seen))
}
