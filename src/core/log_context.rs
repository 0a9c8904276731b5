//! Structured values attached to log entries
//!
//! This module provides:
//! - `FieldValue`: a single structured value
//! - `LogState`: the state carried by an entry or a scope, either a raw value
//!   or an ordered list of key/value pairs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key under which message templates carry their unformatted text.
///
/// It is part of the state but never becomes a label.
pub const ORIGINAL_FORMAT_KEY: &str = "{OriginalFormat}";

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => Ok(()),
        }
    }
}

impl FieldValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// State attached to a log entry or a scope
///
/// `Fields` keeps insertion order and may hold the same key twice; such a
/// state has no map shape and is rendered in its enumerable form instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogState {
    #[default]
    Empty,
    Value(FieldValue),
    Fields(Vec<(String, FieldValue)>),
}

impl LogState {
    /// Start an empty key/value state
    pub fn fields() -> Self {
        LogState::Fields(Vec::new())
    }

    /// Add a field, turning the state into key/value shape if needed
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.add_field(key, value);
        self
    }

    /// Add a field (mutable version)
    ///
    /// A raw value state is replaced, not merged.
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        match self {
            LogState::Fields(fields) => fields.push((key.into(), value.into())),
            _ => *self = LogState::Fields(vec![(key.into(), value.into())]),
        }
    }

    /// Key/value pairs, if the state has that shape
    pub fn pairs(&self) -> Option<&[(String, FieldValue)]> {
        match self {
            LogState::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LogState::Empty => true,
            LogState::Value(_) => false,
            LogState::Fields(fields) => fields.is_empty(),
        }
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        match self {
            LogState::Empty => String::new(),
            LogState::Value(value) => value.to_string(),
            LogState::Fields(fields) => fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<FieldValue> for LogState {
    fn from(value: FieldValue) -> Self {
        LogState::Value(value)
    }
}

impl From<&str> for LogState {
    fn from(value: &str) -> Self {
        LogState::Value(value.into())
    }
}

impl From<String> for LogState {
    fn from(value: String) -> Self {
        LogState::Value(value.into())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for LogState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LogState::Fields(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}
