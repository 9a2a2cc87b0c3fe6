//! Pipeline configuration: defaults for the sharded writer and warehouse
//! materializer, overridable by an optional YAML file and then by CLI flags
//! (CLI wins).

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

fn default_batch_rows() -> usize {
    100_000
}

fn default_row_group_rows() -> usize {
    500_000
}

fn default_file_rows() -> usize {
    2_000_000
}

fn default_compression() -> String {
    "snappy".to_string()
}

fn default_db_name() -> String {
    "warehouse".to_string()
}

fn default_warehouse_dir() -> PathBuf {
    PathBuf::from("warehouse")
}

/// Size-class chunk planner overrides. Tuning only, not part of the core
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChunkPlannerConfig {
    #[serde(default = "ChunkPlannerConfig::default_small_rows")]
    pub small_chunk_rows: usize,
    #[serde(default = "ChunkPlannerConfig::default_medium_rows")]
    pub medium_chunk_rows: usize,
    #[serde(default = "ChunkPlannerConfig::default_large_rows")]
    pub large_chunk_rows: usize,
    #[serde(default = "ChunkPlannerConfig::default_xlarge_rows")]
    pub xlarge_chunk_rows: usize,
}

impl ChunkPlannerConfig {
    fn default_small_rows() -> usize {
        100_000
    }
    fn default_medium_rows() -> usize {
        500_000
    }
    fn default_large_rows() -> usize {
        1_000_000
    }
    fn default_xlarge_rows() -> usize {
        2_000_000
    }
}

impl Default for ChunkPlannerConfig {
    fn default() -> Self {
        Self {
            small_chunk_rows: Self::default_small_rows(),
            medium_chunk_rows: Self::default_medium_rows(),
            large_chunk_rows: Self::default_large_rows(),
            xlarge_chunk_rows: Self::default_xlarge_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    /// Rows buffered per sealed batch, handed from (D) to (E).
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,

    /// Max rows per parquet row-group.
    #[serde(default = "default_row_group_rows")]
    pub row_group_rows: usize,

    /// Max rows per shard file before a new `part-NNNNNN` is opened.
    #[serde(default = "default_file_rows")]
    pub file_rows: usize,

    /// Either "snappy" or "none".
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Directory holding the DuckDB database file.
    #[serde(default = "default_warehouse_dir")]
    pub warehouse_dir: PathBuf,

    /// Database file stem under `warehouse_dir` (file is `<name>.duckdb`).
    #[serde(default = "default_db_name")]
    pub database_name: String,

    #[serde(default)]
    pub chunk_planner: ChunkPlannerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_rows: default_batch_rows(),
            row_group_rows: default_row_group_rows(),
            file_rows: default_file_rows(),
            compression: default_compression(),
            warehouse_dir: default_warehouse_dir(),
            database_name: default_db_name(),
            chunk_planner: ChunkPlannerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML config file, falling back to defaults for any
    /// field the file omits.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::IoFatal {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml_ng::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))
    }

    pub fn database_path(&self) -> PathBuf {
        self.warehouse_dir
            .join(format!("{}.duckdb", self.database_name))
    }

    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(PipelineConfig)
    }
}
