//! Property values as observed in the store, and the type tags inferred from them.

use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Semantic type tag of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Datetime,
    Int,
    Float,
    Boolean,
    String,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Datetime => "datetime",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::String => "string",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed property value.
///
/// `Datetime` holds an ISO-8601 string; every other variant keeps its native
/// representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Datetime(String),
    Str(String),
}

impl PropertyValue {
    /// Convert a JSON value returned by the store.
    ///
    /// The HTTP API renders temporal values as strings, so strings that parse
    /// as date-times become `Datetime`. Null, lists and maps fall through to
    /// `Str` as compact JSON.
    ///
    /// The row format carries no type information, so this is a guess: a
    /// string property that happens to hold RFC 3339 text is reported as
    /// `Datetime`, while a Neo4j `date` or `time` (no date-time part) is
    /// reported as `Str`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Int(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => match parse_datetime(s) {
                Some(iso) => PropertyValue::Datetime(iso),
                None => PropertyValue::Str(s.clone()),
            },
            other => PropertyValue::Str(other.to_string()),
        }
    }
}

/// Map an observed value to its type tag. Total: never fails.
pub fn infer(value: &PropertyValue) -> PropertyType {
    match value {
        PropertyValue::Datetime(_) => PropertyType::Datetime,
        PropertyValue::Bool(_) => PropertyType::Boolean,
        PropertyValue::Int(_) => PropertyType::Int,
        PropertyValue::Float(_) => PropertyType::Float,
        PropertyValue::Str(_) => PropertyType::String,
    }
}

/// Normalize a date-time string to ISO-8601, or `None` if it is not one.
///
/// Accepts RFC 3339 (with an optional trailing `[Region/City]` zone id, as
/// Neo4j prints zoned values) and naive local date-times.
fn parse_datetime(raw: &str) -> Option<String> {
    let trimmed = match raw.find('[') {
        Some(idx) if raw.ends_with(']') => &raw[..idx],
        _ => raw,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}
