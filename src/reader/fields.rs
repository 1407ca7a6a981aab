//! Lenient field accessors over `serde_json::Value`
//!
//! A missing key and an explicit `null` both read as `None`. A present value
//! of the wrong shape is an `Err(FieldError)`; callers decide whether that is
//! worth more than a log line (in this crate it never is).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Why a present field could not be decoded.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid date '{0}'")]
    BadDate(String),

    #[error("value {0} out of range")]
    OutOfRange(String),
}

pub type FieldResult<T> = Result<Option<T>, FieldError>;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong(expected: &'static str, found: &Value) -> FieldError {
    FieldError::WrongType {
        expected,
        found: kind_of(found),
    }
}

/// The named child, or `None` when missing or null.
pub fn get<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

/// Strings are taken as-is; any other scalar or structure is rendered as
/// its JSON text, so a numeric id still reads as a string.
pub fn string(obj: &Value, name: &str) -> Option<String> {
    get(obj, name).map(text_of)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compact JSON text of the named child (geometry objects).
pub fn json(obj: &Value, name: &str) -> Option<String> {
    get(obj, name).map(Value::to_string)
}

pub fn int(obj: &Value, name: &str) -> FieldResult<i64> {
    let Some(value) = get(obj, name) else {
        return Ok(None);
    };
    if let Some(n) = value.as_i64() {
        return Ok(Some(n));
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
        Some(f) => Err(FieldError::OutOfRange(f.to_string())),
        None => Err(wrong("integer", value)),
    }
}

/// A year, stored as a 16-bit signed integer.
pub fn year(obj: &Value, name: &str) -> FieldResult<i16> {
    match int(obj, name)? {
        Some(n) => i16::try_from(n)
            .map(Some)
            .map_err(|_| FieldError::OutOfRange(n.to_string())),
        None => Ok(None),
    }
}

pub fn float(obj: &Value, name: &str) -> FieldResult<f64> {
    match get(obj, name) {
        Some(value) => value.as_f64().map(Some).ok_or_else(|| wrong("number", value)),
        None => Ok(None),
    }
}

/// RFC 3339 timestamps; a timestamp without offset is taken as UTC.
pub fn date(obj: &Value, name: &str) -> FieldResult<DateTime<Utc>> {
    let Some(value) = get(obj, name) else {
        return Ok(None);
    };
    let Some(text) = value.as_str() else {
        return Err(wrong("date string", value));
    };
    parse_date(text).map(Some)
}

fn parse_date(text: &str) -> Result<DateTime<Utc>, FieldError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| FieldError::BadDate(text.to_string()))
}

pub fn array<'a>(obj: &'a Value, name: &str) -> FieldResult<&'a Vec<Value>> {
    match get(obj, name) {
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(wrong("array", other)),
        None => Ok(None),
    }
}

/// Array of strings; non-string items are rendered as JSON text.
pub fn strings(obj: &Value, name: &str) -> FieldResult<Vec<String>> {
    Ok(array(obj, name)?.map(|items| items.iter().map(text_of).collect()))
}

pub fn floats(obj: &Value, name: &str) -> FieldResult<Vec<f64>> {
    let Some(items) = array(obj, name)? else {
        return Ok(None);
    };
    items
        .iter()
        .map(|item| item.as_f64().ok_or_else(|| wrong("number", item)))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
