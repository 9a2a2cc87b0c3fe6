//! Value tokenizer (component A): classifies a single trimmed lexeme into
//! null / integer / float / string, in that recognition order.

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

/// Physical column type committed by the batch builder once it has seen a
/// non-null value for that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Int64,
    Float64,
    Utf8,
}

impl Value {
    pub fn physical_type(&self) -> Option<PhysicalType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(PhysicalType::Int64),
            Value::Float(_) => Some(PhysicalType::Float64),
            Value::Str(_) => Some(PhysicalType::Utf8),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as a string, used when a column is widened to `Utf8`.
    pub fn to_display_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
        }
    }
}

/// Classify a single raw lexeme exactly as it appeared between field
/// separators (already trimmed of leading/trailing ASCII whitespace).
pub fn tokenize(raw: &[u8]) -> Value {
    if raw.is_empty() || raw.eq_ignore_ascii_case(b"NULL") {
        return Value::Null;
    }

    if raw.len() >= 2 {
        let first = raw[0];
        let last = raw[raw.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            return Value::Str(unescape_quoted(&raw[1..raw.len() - 1], first));
        }
    }

    if let Ok(text) = std::str::from_utf8(raw) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if is_decimal_number(text) {
            if let Ok(f) = text.parse::<f64>() {
                return Value::Float(f);
            }
        }
        return Value::Str(text.to_string());
    }

    Value::Str(String::from_utf8_lossy(raw).into_owned())
}

fn is_decimal_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let mut idx = 0;
    if bytes[idx] == b'+' || bytes[idx] == b'-' {
        idx += 1;
    }
    let mut saw_digit = false;
    let mut saw_dot = false;
    let mut saw_exp = false;
    while idx < bytes.len() {
        match bytes[idx] {
            b'0'..=b'9' => saw_digit = true,
            b'.' if !saw_dot && !saw_exp => saw_dot = true,
            b'e' | b'E' if saw_digit && !saw_exp => {
                saw_exp = true;
                if idx + 1 < bytes.len() && (bytes[idx + 1] == b'+' || bytes[idx + 1] == b'-') {
                    idx += 1;
                }
            }
            _ => return false,
        }
        idx += 1;
    }
    saw_digit && (saw_dot || saw_exp)
}

/// Unescape interior content of a quoted string lexeme: doubled delimiters
/// collapse to one, and a backslash immediately before the delimiter escapes
/// it. Backslash is not otherwise interpreted (no `\n`/`\t` rewriting).
fn unescape_quoted(inner: &[u8], delim: u8) -> String {
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        let b = inner[i];
        if b == b'\\' && i + 1 < inner.len() && inner[i + 1] == delim {
            out.push(delim);
            i += 2;
            continue;
        }
        if b == delim && i + 1 < inner.len() && inner[i + 1] == delim {
            out.push(delim);
            i += 2;
            continue;
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
