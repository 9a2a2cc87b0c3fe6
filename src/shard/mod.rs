//! Sharded columnar writer (component E): consumes Arrow batches from (D),
//! splits them across sequentially numbered `part-NNNNNN.parquet` files
//! under row-group and file-row budgets, computes per-file content hashes,
//! and emits a manifest.

pub mod manifest;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression as ParquetCompression;
use parquet::file::properties::WriterProperties;
use sha2::{Digest, Sha256};
use std::path::Path;

use manifest::{FileEntry, Manifest, SchemaDescriptor, SchemaField};

pub const DEFAULT_ROW_GROUP_ROWS: usize = 500_000;
pub const DEFAULT_FILE_ROWS: usize = 2_000_000;

struct OpenShard {
    writer: ArrowWriter<File>,
    path: PathBuf,
    rows_written: u64,
}

pub struct ShardWriter {
    dir: PathBuf,
    file_rows: usize,
    row_group_rows: usize,
    compression: ParquetCompression,
    next_index: u64,
    current: Option<OpenShard>,
    manifest: Manifest,
}

impl ShardWriter {
    pub fn new(
        dir: impl Into<PathBuf>,
        table_name: impl Into<String>,
        file_rows: usize,
        row_group_rows: usize,
        compression: &str,
    ) -> std::io::Result<Self> {
        Self::with_start_index(dir, table_name, file_rows, row_group_rows, compression, 0)
    }

    /// Same as [`Self::new`] but numbers the first shard file from
    /// `start_index` rather than 0. Used by the parallel chunk driver (G)
    /// so concurrent writers sharing one table directory don't collide on
    /// `part-NNNNNN` names; shard ordering across parallel chunks is not a
    /// contract, only within one scanner run.
    pub fn with_start_index(
        dir: impl Into<PathBuf>,
        table_name: impl Into<String>,
        file_rows: usize,
        row_group_rows: usize,
        compression: &str,
        start_index: u64,
    ) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let compression = match compression {
            "none" => ParquetCompression::UNCOMPRESSED,
            _ => ParquetCompression::SNAPPY,
        };
        Ok(Self {
            dir,
            file_rows,
            row_group_rows,
            compression,
            next_index: start_index,
            current: None,
            manifest: Manifest::new(table_name),
        })
    }

    /// Write a batch, splitting it across shard files as needed so no file
    /// exceeds `file_rows`.
    pub fn write_batch(&mut self, batch: &RecordBatch) -> anyhow::Result<()> {
        if self.manifest.schema.fields.is_empty() {
            self.manifest.schema = schema_descriptor(&batch.schema());
        }

        let mut offset = 0usize;
        let total = batch.num_rows();
        while offset < total {
            let open = self.ensure_open(batch.schema())?;
            let remaining_in_file = self.file_rows - open.rows_written as usize;
            let take = remaining_in_file.min(total - offset);
            let slice = batch.slice(offset, take);
            open.writer.write(&slice)?;
            open.rows_written += take as u64;
            offset += take;

            if open.rows_written as usize >= self.file_rows {
                self.close_current()?;
            }
        }
        Ok(())
    }

    fn ensure_open(&mut self, schema: SchemaRef) -> anyhow::Result<&mut OpenShard> {
        if self.current.is_none() {
            let path = self.dir.join(format!("part-{:06}.parquet", self.next_index));
            self.next_index += 1;
            let props = WriterProperties::builder()
                .set_compression(self.compression)
                .set_dictionary_enabled(true)
                .set_statistics_enabled(parquet::file::properties::EnabledStatistics::Chunk)
                .set_max_row_group_size(self.row_group_rows)
                .build();
            let file = File::create(&path)?;
            let writer = ArrowWriter::try_new(file, schema, Some(props))?;
            self.current = Some(OpenShard {
                writer,
                path,
                rows_written: 0,
            });
        }
        Ok(self.current.as_mut().unwrap())
    }

    fn close_current(&mut self) -> anyhow::Result<()> {
        let Some(open) = self.current.take() else {
            return Ok(());
        };
        open.writer.close()?;

        let size_bytes = std::fs::metadata(&open.path)?.len();
        let hash = hash_file(&open.path)?;
        self.manifest.files.push(FileEntry {
            file: open
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            rows: open.rows_written,
            size_bytes,
            hash,
        });
        self.manifest.total_rows += open.rows_written;
        Ok(())
    }

    /// Flush any open file and write `manifest.json` to the shard
    /// directory, returning the finalized manifest.
    pub fn finalize(self) -> anyhow::Result<Manifest> {
        let dir = self.dir.clone();
        let manifest = self.close()?;
        let path = dir.join(manifest::MANIFEST_FILE_NAME);
        std::fs::write(&path, manifest.to_json_pretty()?)?;
        Ok(manifest)
    }

    /// Flush any open file and return the manifest without writing
    /// `manifest.json`. Used by the parallel chunk driver (G), where
    /// several writers share one table directory and only the caller that
    /// merges their manifests should write the final file.
    pub fn close(mut self) -> anyhow::Result<Manifest> {
        self.close_current()?;
        Ok(self.manifest)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn schema_descriptor(schema: &arrow::datatypes::Schema) -> SchemaDescriptor {
    SchemaDescriptor {
        fields: schema
            .fields()
            .iter()
            .map(|f| SchemaField {
                name: f.name().clone(),
                type_name: f.data_type().to_string(),
            })
            .collect(),
    }
}

/// Recomputed by streaming the closed file back through SHA-256: the hash
/// is computed once the file handle is dropped, not incrementally while
/// writing.
fn hash_file(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}
