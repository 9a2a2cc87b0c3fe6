//! Parallel chunk driver (component G): plans a per-source-file chunking
//! strategy and dispatches chunk tasks across a worker pool, aggregating
//! per-chunk outcome records into an import summary.
//!
//! Uses `rayon`'s thread pool for dispatch since Rust threads already give
//! genuine parallelism with a shared address space.

pub mod planner;
pub mod retry;
pub mod split;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;

pub use planner::{classify, plan, ChunkPlan, SizeClass};
pub use retry::retry_with_backoff;
pub use split::split_into_chunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Completed,
    Failed,
}

/// Outcome record for one dispatched chunk.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub chunk_id: usize,
    pub chunk_path: PathBuf,
    pub status: ChunkStatus,
    pub duration: Duration,
    pub rows_processed: u64,
    pub error_message: Option<String>,
}

/// Aggregate summary over a batch of dispatched chunks, matching
/// `ImportStats`.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub table_name: String,
    pub total_chunks: usize,
    pub completed_chunks: usize,
    pub failed_chunks: usize,
    pub total_rows: u64,
    pub duration: Duration,
    pub chunk_outcomes: Vec<ChunkOutcome>,
}

impl ImportSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        (self.completed_chunks as f64 / self.total_chunks as f64) * 100.0
    }

    pub fn rows_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_rows as f64 / secs
    }

    pub fn log_summary(&self) {
        log::info!(
            "import summary for {}: {}/{} chunks completed ({:.1}%), {} rows in {:.1}s ({:.0} rows/sec)",
            self.table_name,
            self.completed_chunks,
            self.total_chunks,
            self.success_rate(),
            self.total_rows,
            self.duration.as_secs_f64(),
            self.rows_per_second(),
        );
    }
}

/// Result returned by the per-chunk processing callable: rows processed by
/// that chunk, on success.
pub type ChunkResult = anyhow::Result<u64>;

/// Dispatch one task per chunk path to a worker pool of `worker_count`
/// threads, running `process` for each and aggregating outcomes. A chunk
/// that returns `Err` is recorded as [`ChunkStatus::Failed`] and siblings
/// continue draining; nothing above this call ever sees the error.
pub fn dispatch<F>(
    table_name: &str,
    chunk_paths: &[PathBuf],
    worker_count: usize,
    process: F,
) -> anyhow::Result<ImportSummary>
where
    F: Fn(&std::path::Path) -> ChunkResult + Sync,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .build()?;

    let start = Instant::now();
    let outcomes: Vec<ChunkOutcome> = pool.install(|| {
        use rayon::prelude::*;
        chunk_paths
            .par_iter()
            .enumerate()
            .map(|(chunk_id, path)| {
                let chunk_start = Instant::now();
                match process(path) {
                    Ok(rows_processed) => ChunkOutcome {
                        chunk_id,
                        chunk_path: path.clone(),
                        status: ChunkStatus::Completed,
                        duration: chunk_start.elapsed(),
                        rows_processed,
                        error_message: None,
                    },
                    Err(e) => {
                        log::error!("chunk {chunk_id} ({}) failed: {e:#}", path.display());
                        ChunkOutcome {
                            chunk_id,
                            chunk_path: path.clone(),
                            status: ChunkStatus::Failed,
                            duration: chunk_start.elapsed(),
                            rows_processed: 0,
                            error_message: Some(format!("{e:#}")),
                        }
                    }
                }
            })
            .collect()
    });

    let completed_chunks = outcomes
        .iter()
        .filter(|o| o.status == ChunkStatus::Completed)
        .count();
    let failed_chunks = outcomes.len() - completed_chunks;
    let total_rows = outcomes.iter().map(|o| o.rows_processed).sum();

    let summary = ImportSummary {
        table_name: table_name.to_string(),
        total_chunks: outcomes.len(),
        completed_chunks,
        failed_chunks,
        total_rows,
        duration: start.elapsed(),
        chunk_outcomes: outcomes,
    };
    summary.log_summary();
    Ok(summary)
}
