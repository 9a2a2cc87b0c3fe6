//! Batch builder (component D): buffers rows, infers per-column physical
//! types from the first non-null sample, appends the derived
//! `mods_key`/`speed_mod` pair, and seals fixed-row Arrow `RecordBatch`es on
//! threshold.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::Diagnostics;
use crate::mods;
use crate::scanner::Row;
use crate::value::{PhysicalType, Value};

/// Fallback schema used when a table's scan produced zero rows: the table
/// still yields one well-formed, zero-row shard with this schema.
pub const EMPTY_INPUT_COLUMNS: &[(&str, PhysicalType)] = &[
    ("id", PhysicalType::Int64),
    ("user_id", PhysicalType::Int64),
    ("beatmap_id", PhysicalType::Int64),
    ("score", PhysicalType::Int64),
    ("data", PhysicalType::Utf8),
    ("mods_key", PhysicalType::Utf8),
    ("speed_mod", PhysicalType::Utf8),
];

pub struct BatchBuilder {
    columns: Vec<String>,
    data_col_idx: Option<usize>,
    batch_rows: usize,
    schema: HashMap<String, PhysicalType>,
    row_buffer: Vec<Row>,
    mods_buffer: Vec<(String, Option<String>)>,
    ever_sealed: bool,
    diag: Arc<Diagnostics>,
}

impl BatchBuilder {
    pub fn new(
        columns: Vec<String>,
        data_col_idx: Option<usize>,
        batch_rows: usize,
        diag: Arc<Diagnostics>,
    ) -> Self {
        Self {
            columns,
            data_col_idx,
            batch_rows,
            schema: HashMap::new(),
            row_buffer: Vec::new(),
            mods_buffer: Vec::new(),
            ever_sealed: false,
            diag,
        }
    }

    /// Append one row; returns a sealed batch once `batch_rows` is reached.
    pub fn push(&mut self, row: Row) -> Option<RecordBatch> {
        let raw_data = self
            .data_col_idx
            .and_then(|idx| row.values.get(idx))
            .and_then(Value::to_display_string);

        if raw_data.is_some() && mods::is_json_ignored(raw_data.as_deref()) {
            self.diag.record_json_ignored();
        }
        let derived = mods::normalize(raw_data.as_deref());

        self.row_buffer.push(row);
        self.mods_buffer.push(derived);

        if self.row_buffer.len() >= self.batch_rows {
            Some(self.seal())
        } else {
            None
        }
    }

    /// Seal whatever remains buffered. Called at end-of-input; if nothing
    /// was ever pushed and nothing was ever sealed, returns the fixed
    /// empty-input default schema batch (zero rows).
    pub fn finish(&mut self) -> RecordBatch {
        if self.row_buffer.is_empty() && !self.ever_sealed {
            return empty_default_batch();
        }
        if self.row_buffer.is_empty() {
            return self.seal_with(&self.columns.clone(), &[], &[]);
        }
        self.seal()
    }

    fn seal(&mut self) -> RecordBatch {
        self.ever_sealed = true;
        let columns = self.columns.clone();
        let rows = std::mem::take(&mut self.row_buffer);
        let mods = std::mem::take(&mut self.mods_buffer);
        self.seal_with(&columns, &rows, &mods)
    }

    fn seal_with(
        &mut self,
        columns: &[String],
        rows: &[Row],
        mods_buf: &[(String, Option<String>)],
    ) -> RecordBatch {
        let mut fields = Vec::with_capacity(columns.len() + 2);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len() + 2);

        for (idx, name) in columns.iter().enumerate() {
            let values: Vec<&Value> = rows
                .iter()
                .map(|r| r.values.get(idx).unwrap_or(&Value::Null))
                .collect();
            let (field, array) = self.build_column(name, &values);
            fields.push(field);
            arrays.push(array);
        }

        fields.push(Field::new("mods_key", DataType::Utf8, true));
        arrays.push(Arc::new(arrow::array::StringArray::from(
            mods_buf
                .iter()
                .map(|(k, _)| Some(k.clone()))
                .collect::<Vec<_>>(),
        )) as ArrayRef);

        fields.push(Field::new("speed_mod", DataType::Utf8, true));
        arrays.push(Arc::new(arrow::array::StringArray::from(
            mods_buf.iter().map(|(_, s)| s.clone()).collect::<Vec<_>>(),
        )) as ArrayRef);

        let schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(schema, arrays).expect("column lengths match row count")
    }

    fn build_column(&mut self, name: &str, values: &[&Value]) -> (Field, ArrayRef) {
        let inferred = values.iter().find_map(|v| v.physical_type());
        let committed = *self
            .schema
            .entry(name.to_string())
            .or_insert_with(|| inferred.unwrap_or(PhysicalType::Utf8));

        let conflict = values.iter().any(|v| match (committed, v.physical_type()) {
            (_, None) => false,
            (PhysicalType::Int64, Some(PhysicalType::Int64)) => false,
            (PhysicalType::Float64, Some(PhysicalType::Int64)) => false,
            (PhysicalType::Float64, Some(PhysicalType::Float64)) => false,
            (PhysicalType::Utf8, Some(_)) => false,
            _ => true,
        });

        let effective = if conflict {
            self.diag.record_type_widen(name);
            self.schema.insert(name.to_string(), PhysicalType::Utf8);
            PhysicalType::Utf8
        } else {
            committed
        };

        build_typed_array(name, effective, values)
    }
}

fn build_typed_array(name: &str, ty: PhysicalType, values: &[&Value]) -> (Field, ArrayRef) {
    match ty {
        PhysicalType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for v in values {
                match v {
                    Value::Int(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            (
                Field::new(name, DataType::Int64, true),
                Arc::new(builder.finish()) as ArrayRef,
            )
        }
        PhysicalType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for v in values {
                match v {
                    Value::Float(f) => builder.append_value(*f),
                    Value::Int(i) => builder.append_value(*i as f64),
                    _ => builder.append_null(),
                }
            }
            (
                Field::new(name, DataType::Float64, true),
                Arc::new(builder.finish()) as ArrayRef,
            )
        }
        PhysicalType::Utf8 => {
            let mut builder = StringBuilder::new();
            for v in values {
                match v.to_display_string() {
                    Some(s) => builder.append_value(s),
                    None => builder.append_null(),
                }
            }
            (
                Field::new(name, DataType::Utf8, true),
                Arc::new(builder.finish()) as ArrayRef,
            )
        }
    }
}

fn empty_default_batch() -> RecordBatch {
    let mut fields = Vec::with_capacity(EMPTY_INPUT_COLUMNS.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(EMPTY_INPUT_COLUMNS.len());
    for (name, ty) in EMPTY_INPUT_COLUMNS {
        let (field, array) = build_typed_array(name, *ty, &[]);
        fields.push(field);
        arrays.push(array);
    }
    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).expect("empty arrays always match")
}
