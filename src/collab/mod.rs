//! Built-in collaborators and the wire codecs they share.
//!
//! The orchestrator never touches pipe contents; these are the separate
//! processes it spawns (hidden subcommands of the rowfan binary). Each one
//! does its own blocking FIFO opens and works equally well against regular
//! files, which is how the tests exercise them.
//!
//! Records are newline-terminated lines in both formats:
//! - `tsv`: fields joined by tabs; backslash, tab, CR and LF are escaped,
//!   NULL is the bare sentinel `\N`, blobs are `\x<hex>` (both checked
//!   before unescaping, so literal text round-trips).
//! - `jsonl`: one JSON object per row keyed by column name; blobs are
//!   `{"hex": "..."}` objects.

pub mod load;
pub mod mux;
pub mod unload;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value as SqlValue;

use crate::types::Format;

const TSV_NULL: &str = "\\N";
const TSV_BLOB_PREFIX: &str = "\\x";

/// Encode one row as a single line (no trailing newline).
pub fn encode_row(format: Format, columns: &[String], row: &[SqlValue]) -> String {
    match format {
        Format::Tsv => row
            .iter()
            .map(sql_to_tsv_field)
            .collect::<Vec<_>>()
            .join("\t"),
        Format::Jsonl => {
            let mut obj = serde_json::Map::with_capacity(columns.len());
            for (name, value) in columns.iter().zip(row) {
                obj.insert(name.clone(), sql_to_json(value));
            }
            serde_json::Value::Object(obj).to_string()
        }
    }
}

/// Decode one line into values ordered like `columns`.
pub fn decode_row(format: Format, columns: &[String], line: &str) -> Result<Vec<SqlValue>> {
    match format {
        Format::Tsv => {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != columns.len() {
                bail!(
                    "tsv record has {} fields, table has {} columns",
                    fields.len(),
                    columns.len()
                );
            }
            fields.iter().map(|f| tsv_field_to_sql(f)).collect()
        }
        Format::Jsonl => {
            let parsed: serde_json::Value =
                serde_json::from_str(line).context("parse jsonl record")?;
            let serde_json::Value::Object(obj) = parsed else {
                bail!("jsonl record is not an object");
            };
            columns
                .iter()
                .map(|name| match obj.get(name) {
                    None => Ok(SqlValue::Null),
                    Some(v) => json_to_sql(v),
                })
                .collect()
        }
    }
}

fn sql_to_tsv_field(v: &SqlValue) -> String {
    match v {
        SqlValue::Null => TSV_NULL.to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(r) => r.to_string(),
        SqlValue::Text(s) => escape_tsv(s),
        SqlValue::Blob(b) => format!("{}{}", TSV_BLOB_PREFIX, to_hex(b)),
    }
}

fn tsv_field_to_sql(field: &str) -> Result<SqlValue> {
    // Sentinels use a single backslash; escaped text always carries two.
    if field == TSV_NULL {
        return Ok(SqlValue::Null);
    }
    if let Some(hex) = field.strip_prefix(TSV_BLOB_PREFIX) {
        return Ok(SqlValue::Blob(from_hex(hex)?));
    }
    Ok(SqlValue::Text(unescape_tsv(field)?))
}

fn sql_to_json(v: &SqlValue) -> serde_json::Value {
    match v {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => serde_json::Value::from(*i),
        SqlValue::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        SqlValue::Text(s) => serde_json::Value::String(s.clone()),
        SqlValue::Blob(b) => serde_json::json!({ "hex": to_hex(b) }),
    }
}

fn json_to_sql(v: &serde_json::Value) -> Result<SqlValue> {
    match v {
        serde_json::Value::Null => Ok(SqlValue::Null),
        serde_json::Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else {
                Ok(SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
        serde_json::Value::Object(obj) => {
            if let Some(serde_json::Value::String(hex)) = obj.get("hex") {
                if obj.len() == 1 {
                    return Ok(SqlValue::Blob(from_hex(hex)?));
                }
            }
            bail!("jsonl field is an object but not a {{\"hex\": …}} blob")
        }
        serde_json::Value::Array(_) => bail!("jsonl field is an array; not a column value"),
    }
}

fn escape_tsv(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_tsv(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => bail!("bad tsv escape \\{}", other.unwrap_or(' ')),
        }
    }
    Ok(out)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn from_hex(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        bail!("odd-length hex in blob field");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).context("bad hex in blob field"))
        .collect()
}

/// Quote an identifier for SQLite (table or column name).
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
