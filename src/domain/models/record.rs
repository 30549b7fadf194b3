//! Log records and their structured fields.

use std::panic::Location;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::level::Level;

/// Call site of a log statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Source file as recorded by the compiler
    pub file: &'static str,
    /// Line number
    pub line: u32,
}

impl Caller {
    /// Call site of a `#[track_caller]` location.
    pub fn from_location(location: &Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }

    /// `dir/file.rs:line`, keeping only the last two path segments.
    pub fn short(&self) -> String {
        let trimmed = self
            .file
            .rmatch_indices(['/', '\\'])
            .nth(1)
            .map_or(self.file, |(idx, _)| &self.file[idx + 1..]);
        format!("{trimmed}:{}", self.line)
    }

    /// `path/to/file.rs:line` with the path as recorded.
    pub fn full(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Typed value of a structured field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text
    Str(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Float; non-finite values are written as text
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Rendered with the configured duration format
    Duration(Duration),
    /// Rendered with the configured time format
    Time(DateTime<Utc>),
    /// Arbitrary JSON, written as is
    Json(Value),
}

/// Structured key/value pair attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Output key
    pub key: String,
    /// Typed value
    pub value: FieldValue,
}

impl Field {
    /// Field from any value with a [`FieldValue`] conversion.
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Text field.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Str(value.into()))
    }

    /// Duration field.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    /// Timestamp field.
    pub fn time(key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Self::new(key, FieldValue::Time(value))
    }

    /// Any serializable value; falls back to its debug text if serialization fails.
    pub fn any<T: serde::Serialize + std::fmt::Debug>(key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .map_or_else(|_| FieldValue::Str(format!("{value:?}")), FieldValue::Json);
        Self::new(key, value)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Duration> for FieldValue {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

/// A single log event as handed to encoders.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Severity
    pub level: Level,
    /// Human-readable message
    pub message: String,
    /// When the record was emitted
    pub timestamp: DateTime<Utc>,
    /// Dot-joined logger name
    pub name: Option<String>,
    /// Structured fields in output order
    pub fields: Vec<Field>,
    /// Call site of the log statement
    pub caller: Option<Caller>,
    /// Captured stack trace
    pub stacktrace: Option<String>,
}

impl LogRecord {
    /// Record with no name, fields, caller or stack trace.
    pub fn new(level: Level, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
            name: None,
            fields: Vec::new(),
            caller: None,
            stacktrace: None,
        }
    }

    /// Replace the structured fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Set the call site.
    #[must_use]
    pub const fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }
}
