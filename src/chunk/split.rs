//! Chunk-file splitting: turn one large dump file into `chunk_rows`-sized
//! sibling dump files, each a minimal standalone `INSERT` statement for the
//! same table, so they can be ingested independently by the dispatcher in
//! [`super::dispatch`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::compress::Compression;
use crate::error::{Diagnostics, PipelineError};
use crate::scanner::Scanner;
use crate::value::Value;

/// Scan `input_path` for `table` and write out `chunk_rows`-sized dump
/// files under `chunk_dir`, returning their paths in scan order. Only used
/// when `run --parallel` is requested; a plain `ingest` always reads the
/// source file directly and never materializes intermediate chunk files.
pub fn split_into_chunks(
    input_path: &Path,
    table: &str,
    chunk_dir: &Path,
    chunk_rows: usize,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(chunk_dir)?;

    let file = File::open(input_path).map_err(|source| PipelineError::IoFatal {
        path: input_path.to_path_buf(),
        source,
    })?;
    let compression = Compression::from_path(input_path);
    let reader = compression.wrap_reader(Box::new(file));
    let mut scanner = Scanner::new(reader, table);
    let diag = Diagnostics::new();

    let mut paths = Vec::new();
    let mut chunk_id = 0usize;
    let mut buf: Vec<Vec<Value>> = Vec::with_capacity(chunk_rows.min(4096));
    let mut columns: Option<Vec<String>> = None;

    while let Some(row) = scanner.next_row(&diag)? {
        if columns.is_none() {
            columns = Some(scanner.columns.clone());
        }
        buf.push(row.values);
        if buf.len() >= chunk_rows {
            paths.push(write_chunk(
                chunk_dir,
                table,
                chunk_id,
                columns.as_ref().unwrap(),
                &buf,
            )?);
            chunk_id += 1;
            buf.clear();
        }
    }
    if !buf.is_empty() {
        let columns = columns.unwrap_or_else(|| scanner.columns.clone());
        paths.push(write_chunk(chunk_dir, table, chunk_id, &columns, &buf)?);
    }
    Ok(paths)
}

fn write_chunk(
    chunk_dir: &Path,
    table: &str,
    chunk_id: usize,
    columns: &[String],
    rows: &[Vec<Value>],
) -> anyhow::Result<PathBuf> {
    let path = chunk_dir.join(format!("chunk-{chunk_id:06}.sql"));
    let mut w = BufWriter::new(File::create(&path)?);

    write!(w, "INSERT INTO `{table}` (")?;
    for (i, c) in columns.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        write!(w, "`{c}`")?;
    }
    write!(w, ") VALUES ")?;

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        write!(w, "(")?;
        for (j, v) in row.iter().enumerate() {
            if j > 0 {
                write!(w, ",")?;
            }
            write!(w, "{}", render_value(v))?;
        }
        write!(w, ")")?;
    }
    writeln!(w, ";")?;
    w.flush()?;
    Ok(path)
}

fn render_value(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rows_into_chunk_files_by_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let sql_path = dir.path().join("dump.sql");
        let mut rows = String::new();
        for i in 0..250 {
            rows.push_str(&format!(
                "INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`pp`,`playmode`,`data`) VALUES ({i},1,2,500,0,'{{}}');\n"
            ));
        }
        std::fs::write(&sql_path, rows).unwrap();

        let chunk_dir = dir.path().join("chunks");
        let paths = split_into_chunks(&sql_path, "scores", &chunk_dir, 100).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("chunk-000000.sql"));
        assert!(paths[2].ends_with("chunk-000002.sql"));
    }

    #[test]
    fn empty_scan_yields_no_chunk_files() {
        let dir = tempfile::tempdir().unwrap();
        let sql_path = dir.path().join("dump.sql");
        std::fs::write(&sql_path, b"INSERT INTO `other` VALUES (1,'a');").unwrap();

        let chunk_dir = dir.path().join("chunks");
        let paths = split_into_chunks(&sql_path, "scores", &chunk_dir, 100).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn reconstructed_chunk_round_trips_through_the_scanner() {
        let dir = tempfile::tempdir().unwrap();
        let sql_path = dir.path().join("dump.sql");
        std::fs::write(
            &sql_path,
            br#"INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`pp`,`playmode`,`data`) VALUES (1,101,201,500.5,0,'it''s {"mods":[]}');"#,
        )
        .unwrap();

        let chunk_dir = dir.path().join("chunks");
        let paths = split_into_chunks(&sql_path, "scores", &chunk_dir, 100).unwrap();
        assert_eq!(paths.len(), 1);

        let file = File::open(&paths[0]).unwrap();
        let mut scanner = Scanner::new(file, "scores");
        let diag = Diagnostics::new();
        let row = scanner.next_row(&diag).unwrap().unwrap();
        assert_eq!(row.values[0], Value::Int(1));
        assert_eq!(row.values[3], Value::Float(500.5));
        assert_eq!(row.values[5], Value::Str("it's {\"mods\":[]}".to_string()));
        assert!(scanner.next_row(&diag).unwrap().is_none());
    }
}
