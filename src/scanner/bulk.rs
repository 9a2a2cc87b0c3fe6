//! Bulk-mode scan (opt-in optimization, not wired into the batch builder or
//! CLI). Matches a whole `INSERT ... VALUES (...), (...);` statement with
//! one regex and then tuple-splits the captured body the same way the
//! byte-oriented scanner does, so output is indistinguishable from it on
//! well-formed, single-physical-line input.
//!
//! Diverges from the byte-oriented scanner on tuples that straddle a line
//! boundary in certain malformed inputs; documented here rather than
//! papered over.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::value::{tokenize, Value};

use super::Row;

static STATEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)INSERT\s+INTO\s+[`"]?([A-Za-z0-9_]+)[`"]?\s*(\([^()]*(?:\([^()]*\)[^()]*)*\))?\s*VALUES\s*(.*?);"#).unwrap()
});

/// Scan an entire in-memory dump buffer in one pass using a single regex
/// over each statement, splitting tuples the same way
/// [`super::Scanner`] does. Intended for statements that fit in memory and
/// in a single physical line; callers who can't guarantee that should use
/// [`super::Scanner`] instead.
///
/// Returns raw, untransformed [`Row`]s, exactly as [`super::Scanner::next_row`]
/// does; resolving the `data` column's index for mod extraction (component
/// C) is the caller's job, via [`data_col_idx`] against whatever column list
/// the statement declared.
pub fn scan_bulk(data: &[u8], target_table: &str) -> Vec<Row> {
    let mut rows = Vec::new();

    for caps in STATEMENT_RE.captures_iter(data) {
        let table = String::from_utf8_lossy(&caps[1]);
        if !table.eq_ignore_ascii_case(target_table) {
            continue;
        }
        let Some(body) = caps.get(3) else { continue };
        for tuple in super_split_tuples(body.as_bytes()) {
            rows.push(Row {
                values: tuple.into_iter().map(|raw| tokenize(trim(raw))).collect(),
            });
        }
    }

    rows
}

/// Resolve the `data` column's index from a declared column list, the same
/// way [`super::Scanner::data_col_idx`] does. Exists so a caller of
/// [`scan_bulk`] never needs to hardcode a fixed tuple offset, even though
/// `scan_bulk` itself is schema-agnostic.
pub fn data_col_idx(columns: &[String]) -> Option<usize> {
    columns.iter().position(|c| c == "data")
}

/// Re-exposes the byte-oriented scanner's tuple splitter; kept as a
/// separate binding rather than `pub use` so callers can see this module
/// deliberately shares the splitting logic but not the statement-boundary
/// logic with the byte-oriented path.
fn super_split_tuples(body: &[u8]) -> Vec<Vec<&[u8]>> {
    split_tuples(body)
}

fn split_tuples(body: &[u8]) -> Vec<Vec<&[u8]>> {
    let mut tuples = Vec::new();
    let mut i = 0usize;

    while i < body.len() {
        while i < body.len() && body[i] != b'(' {
            i += 1;
        }
        if i >= body.len() {
            break;
        }
        let mut depth = 1i32;
        let mut in_string = false;
        let mut delim = 0u8;
        let mut escape_next = false;
        let mut field_start = i + 1;
        let mut fields = Vec::new();
        let mut j = i + 1;
        let mut truncated = true;

        while j < body.len() {
            let b = body[j];
            if in_string {
                if escape_next {
                    escape_next = false;
                } else if b == b'\\' {
                    escape_next = true;
                } else if b == delim {
                    in_string = false;
                }
                j += 1;
                continue;
            }
            match b {
                b'\'' | b'"' => {
                    in_string = true;
                    delim = b;
                }
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        fields.push(&body[field_start..j]);
                        truncated = false;
                        j += 1;
                        break;
                    }
                }
                b',' if depth == 1 => {
                    fields.push(&body[field_start..j]);
                    field_start = j + 1;
                }
                _ => {}
            }
            j += 1;
        }

        if !truncated {
            tuples.push(fields);
        } else {
            break;
        }
        i = j;
    }

    tuples
}

fn trim(raw: &[u8]) -> &[u8] {
    let start = raw.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|p| p + 1)
        .unwrap_or(0);
    if start >= end {
        &[]
    } else {
        &raw[start..end]
    }
}
