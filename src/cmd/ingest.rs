use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::Diagnostics;
use crate::ingest::ingest_file;

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    table: String,
    output: PathBuf,
    mut config: PipelineConfig,
    batch_rows: Option<usize>,
    file_rows: Option<usize>,
    progress: bool,
) -> anyhow::Result<()> {
    if let Some(n) = batch_rows {
        config.batch_rows = n;
    }
    if let Some(n) = file_rows {
        config.file_rows = n;
    }

    let diag = Arc::new(Diagnostics::new());
    let (manifest, rows) = ingest_file(&file, &table, &output, &config, diag.clone(), progress)?;

    log::info!(
        "ingested {} rows for `{}` into {} file(s) under {}",
        rows,
        table,
        manifest.files.len(),
        output.join(&table).display()
    );
    println!("{}", diag.snapshot());
    Ok(())
}
