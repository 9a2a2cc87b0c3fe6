//! Dump scanner (component B): a byte-oriented state machine that locates
//! `INSERT INTO <table>` statements targeting a named table and yields
//! tuple field-lists as complete rows are recognized.
//!
//! Statement-boundary detection (finding the terminating `;` of an
//! `INSERT` statement, skipping `--`/`/* */` comments) runs ahead of tuple
//! decomposition within the `VALUES` body, a finer byte-at-a-time machine.

pub mod bulk;

use std::io::{BufReader, Read};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::error::Diagnostics;
use crate::value::{tokenize, Value};

pub const DEFAULT_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "beatmap_id",
    "score",
    "pp",
    "playmode",
    "data",
];

static INSERT_INTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)^\s*INSERT\s+INTO\s+[`"]?([A-Za-z0-9_]+)[`"]?\s*"#).unwrap());

static VALUES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)\bVALUES\b").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

/// A scanner over one dump stream, targeting rows for a single table name.
pub struct Scanner<R: Read> {
    reader: BufReader<R>,
    target_table: String,
    /// Column list resolved from the first matching statement's explicit
    /// column list, or `DEFAULT_COLUMNS` if none was ever declared.
    pub columns: Vec<String>,
    columns_resolved: bool,
    pending: std::collections::VecDeque<Row>,
    eof: bool,
    read_buf: Vec<u8>,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R, target_table: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            target_table: target_table.into(),
            columns: DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            columns_resolved: false,
            pending: std::collections::VecDeque::new(),
            eof: false,
            read_buf: Vec::new(),
        }
    }

    /// Index of the `data` column within `self.columns`, resolved from the
    /// declared column list rather than any fixed tuple offset.
    pub fn data_col_idx(&self) -> Option<usize> {
        self.columns.iter().position(|c| c == "data")
    }

    /// Pull the next recognized row, reading and discarding statements for
    /// other tables as needed. Returns `Ok(None)` at clean EOF.
    pub fn next_row(&mut self, diag: &Diagnostics) -> std::io::Result<Option<Row>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.eof {
                return Ok(None);
            }
            match self.read_statement()? {
                Some(stmt) => self.process_statement(&stmt, diag),
                None => self.eof = true,
            }
        }
    }

    /// Read one complete, comment-stripped statement (up to and including
    /// its terminating `;`), or `None` at EOF with no remaining bytes.
    fn read_statement(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        let mut in_string = false;
        let mut string_delim = 0u8;
        let mut escape_next = false;
        let mut paren_depth: i32 = 0;
        let mut saw_any = false;

        loop {
            let n = self.reader.read(&mut byte)?;
            if n == 0 {
                break;
            }
            saw_any = true;
            let b = byte[0];

            // Comment skipping, only meaningful outside strings.
            if !in_string {
                if b == b'-' {
                    if let Some(next) = self.peek_byte()? {
                        if next == b'-' {
                            self.skip_line_comment()?;
                            continue;
                        }
                    }
                }
                if b == b'/' {
                    if let Some(next) = self.peek_byte()? {
                        if next == b'*' {
                            self.skip_block_comment()?;
                            continue;
                        }
                    }
                }
            }

            out.push(b);

            if in_string {
                if escape_next {
                    escape_next = false;
                } else if b == b'\\' {
                    escape_next = true;
                } else if b == string_delim {
                    // Doubled delimiter stays inside the string; peek ahead.
                    if let Some(next) = self.peek_byte()? {
                        if next == string_delim {
                            let mut nb = [0u8; 1];
                            self.reader.read_exact(&mut nb)?;
                            out.push(nb[0]);
                            continue;
                        }
                    }
                    in_string = false;
                }
                continue;
            }

            match b {
                b'\'' | b'"' => {
                    in_string = true;
                    string_delim = b;
                }
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                b';' if paren_depth <= 0 => break,
                _ => {}
            }
        }

        if !saw_any && out.is_empty() {
            return Ok(None);
        }
        Ok(Some(out))
    }

    fn peek_byte(&mut self) -> std::io::Result<Option<u8>> {
        use std::io::BufRead;
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn skip_line_comment(&mut self) -> std::io::Result<()> {
        let mut byte = [0u8; 1];
        loop {
            let n = self.reader.read(&mut byte)?;
            if n == 0 || byte[0] == b'\n' {
                return Ok(());
            }
        }
    }

    fn skip_block_comment(&mut self) -> std::io::Result<()> {
        let mut prev = 0u8;
        let mut byte = [0u8; 1];
        loop {
            let n = self.reader.read(&mut byte)?;
            if n == 0 {
                return Ok(());
            }
            if prev == b'*' && byte[0] == b'/' {
                return Ok(());
            }
            prev = byte[0];
        }
    }

    fn process_statement(&mut self, stmt: &[u8], diag: &Diagnostics) {
        let Some(caps) = INSERT_INTO_RE.captures(stmt) else {
            return;
        };
        let table = String::from_utf8_lossy(&caps[1]);
        if !table.eq_ignore_ascii_case(&self.target_table) {
            return;
        }

        let after_table = &stmt[caps.get(0).unwrap().end()..];

        if let Some(cols) = try_parse_column_list(after_table) {
            if !self.columns_resolved {
                self.columns = cols;
                self.columns_resolved = true;
            }
        } else if !self.columns_resolved {
            self.columns_resolved = true;
        }

        let Some(values_match) = VALUES_RE.find(after_table) else {
            return;
        };
        let body = &after_table[values_match.end()..];

        let (tuples, truncated) = split_tuples(body);
        for tuple in tuples {
            self.pending.push_back(Row {
                values: tuple.iter().map(|raw| tokenize(trim(raw))).collect(),
            });
        }
        if truncated {
            diag.record_lexical_skip();
        }
    }
}

/// If `after_table` starts (after whitespace) with a parenthesized
/// identifier list, parse and return it; otherwise `None`.
fn try_parse_column_list(after_table: &[u8]) -> Option<Vec<String>> {
    let trimmed = trim(after_table);
    if !trimmed.starts_with(b"(") {
        return None;
    }
    let close = find_matching_paren(trimmed, 0)?;
    let inner = &trimmed[1..close];
    Some(
        inner
            .split(|&b| b == b',')
            .map(|raw| {
                let raw = trim(raw);
                let raw = raw
                    .strip_prefix(b"`")
                    .and_then(|r| r.strip_suffix(b"`"))
                    .or_else(|| raw.strip_prefix(b"\"").and_then(|r| r.strip_suffix(b"\"")))
                    .unwrap_or(raw);
                String::from_utf8_lossy(raw).into_owned()
            })
            .collect(),
    )
}

fn find_matching_paren(buf: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut delim = 0u8;
    let mut escape_next = false;
    for (i, &b) in buf.iter().enumerate().skip(open_idx) {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if b == b'\\' {
                escape_next = true;
            } else if b == delim {
                in_string = false;
            }
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
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split the `VALUES (...), (...), ...` body into tuples of raw (still
/// quoted/escaped) field byte slices, honoring nested parens and strings.
/// The second return value is `true` when a truncated tuple was
/// encountered and discarded.
fn split_tuples(body: &[u8]) -> (Vec<Vec<&[u8]>>, bool) {
    let mut tuples = Vec::new();
    let mut i = 0usize;

    while i < body.len() {
        while i < body.len() && body[i] != b'(' {
            if body[i] == b';' {
                return (tuples, false);
            }
            i += 1;
        }
        if i >= body.len() {
            break;
        }
        // i points at the opening '(' of a tuple.
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
        }
        // Truncated tuple (EOF mid-field/mid-tuple): discard it and stop;
        // earlier complete tuples remain valid.
        if truncated {
            return (tuples, true);
        }
        i = j;
    }

    (tuples, false)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_for(sql: &[u8], table: &str) -> Vec<Row> {
        let diag = Diagnostics::new();
        let mut scanner = Scanner::new(sql, table);
        let mut rows = Vec::new();
        while let Some(row) = scanner.next_row(&diag).unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn single_row_with_mods_payload_is_recognized() {
        let sql = br#"INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`pp`,`playmode`,`data`) VALUES (1,101,201,500,0,'{"mods":[{"acronym":"HR"},{"acronym":"DT"}]}');"#;
        let rows = rows_for(sql, "scores");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values[0], Value::Int(1));
        assert_eq!(rows[0].values[2], Value::Int(201));
    }

    #[test]
    fn multiple_tuples_one_statement() {
        let sql = b"INSERT INTO `scores` VALUES (1,'a'), (2,'b'), (3,'c');";
        let rows = rows_for(sql, "scores");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].values[0], Value::Int(2));
        assert_eq!(rows[1].values[1], Value::Str("b".to_string()));
    }

    #[test]
    fn non_target_table_skipped() {
        let sql = b"INSERT INTO `other` VALUES (1,'a'); INSERT INTO `scores` VALUES (2,'b');";
        let rows = rows_for(sql, "scores");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values[0], Value::Int(2));
    }

    #[test]
    fn comments_are_stripped() {
        let sql = b"-- a comment\nINSERT INTO `scores` VALUES (1,'a'); /* trailing */";
        let rows = rows_for(sql, "scores");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn truncated_tuple_discarded_earlier_rows_kept() {
        let sql = b"INSERT INTO `scores` VALUES (1,'a'), (2,'unterminated";
        let rows = rows_for(sql, "scores");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values[0], Value::Int(1));
    }

    #[test]
    fn truncated_tuple_records_lexical_skip() {
        let sql = b"INSERT INTO `scores` VALUES (1,'a'), (2,'unterminated";
        let diag = Diagnostics::new();
        let mut scanner = Scanner::new(sql.as_slice(), "scores");
        while scanner.next_row(&diag).unwrap().is_some() {}
        assert_eq!(diag.snapshot().lexical_skips, 1);
    }

    #[test]
    fn explicit_column_list_resolves_data_index() {
        let sql = b"INSERT INTO `scores` (`id`,`data`) VALUES (1,'{}');";
        let diag = Diagnostics::new();
        let mut scanner = Scanner::new(sql.as_slice(), "scores");
        scanner.next_row(&diag).unwrap();
        assert_eq!(scanner.data_col_idx(), Some(1));
    }

    #[test]
    fn default_columns_used_when_no_list_declared() {
        let sql = b"INSERT INTO `scores` VALUES (1,2,3,4,5,0,'{}');";
        let diag = Diagnostics::new();
        let mut scanner = Scanner::new(sql.as_slice(), "scores");
        scanner.next_row(&diag).unwrap();
        assert_eq!(scanner.data_col_idx(), Some(6));
    }
}
