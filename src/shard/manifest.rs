//! Per-table manifest document: `version`, the list of written files, and
//! the resolved schema.

use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1.0";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub file: String,
    pub rows: u64,
    pub size_bytes: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaDescriptor {
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub table_name: String,
    pub version: String,
    pub created_at: String,
    pub total_rows: u64,
    pub files: Vec<FileEntry>,
    pub schema: SchemaDescriptor,
}

impl Manifest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            version: MANIFEST_VERSION.to_string(),
            created_at: now_utc_string(),
            total_rows: 0,
            files: Vec::new(),
            schema: SchemaDescriptor { fields: Vec::new() },
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Combine manifests from several chunk writers sharing one table
    /// directory (parallel chunk driver, component G) into a single
    /// manifest covering all their files. Chunk order is preserved in
    /// `files`, matching the "ordering across parallel chunks is not
    /// guaranteed" rule in reverse: we don't try to recover a global
    /// order, we just concatenate in dispatch-return order.
    pub fn merge(table_name: impl Into<String>, chunks: Vec<Manifest>) -> Self {
        let mut merged = Manifest::new(table_name);
        for chunk in chunks {
            if merged.schema.fields.is_empty() {
                merged.schema = chunk.schema;
            }
            merged.total_rows += chunk.total_rows;
            merged.files.extend(chunk.files);
        }
        merged
    }
}

fn now_utc_string() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
