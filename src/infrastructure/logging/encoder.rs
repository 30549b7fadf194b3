//! Record encoding driven by [`EncoderConfig`]
//!
//! JSON records are single-line objects whose keys appear in a fixed order:
//! level, time, name, caller, message, the structured fields in call order,
//! then the stack trace. A structured field whose key is already taken, by
//! the record's own parts or an earlier field, is written under
//! `fields.<key>` instead, so it never replaces a value already written. Console records are
//! tab-separated with the structured fields appended as one JSON object.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use console::Style;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::domain::models::{
    CallerFormat, DurationFormat, EncoderConfig, Encoding, Field, FieldValue, Level, LevelFormat,
    LogRecord, TimeFormat, TimeZoneMode,
};

/// Prefix given to structured field keys that collide with record keys.
pub const COLLISION_PREFIX: &str = "fields.";

/// Serializes records according to an [`EncoderConfig`].
#[derive(Debug, Clone)]
pub struct RecordEncoder {
    config: EncoderConfig,
    time_zone: TimeZoneMode,
}

impl RecordEncoder {
    /// Encoder for `config`, rendering times in `time_zone`.
    pub fn new(config: EncoderConfig, time_zone: TimeZoneMode) -> Self {
        Self {
            config: config.normalized(),
            time_zone,
        }
    }

    /// Normalized configuration in use.
    pub const fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode one record, including the configured line ending.
    pub fn encode(&self, record: &LogRecord) -> Vec<u8> {
        let mut line = match self.config.encoding {
            Encoding::Json => self.encode_json(record),
            Encoding::Console => self.encode_console(record),
        };
        line.push_str(&self.config.line_ending);
        line.into_bytes()
    }

    fn encode_json(&self, record: &LogRecord) -> String {
        let keys = &self.config.keys;
        let mut object = Map::new();

        object.insert(keys.level.clone(), Value::String(self.format_level(record.level)));
        object.insert(keys.time.clone(), self.format_time(record.timestamp));
        if let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) {
            object.insert(keys.name.clone(), Value::String(name.to_string()));
        }
        if let Some(caller) = &record.caller {
            object.insert(keys.caller.clone(), Value::String(self.format_caller(caller)));
        }
        object.insert(keys.message.clone(), Value::String(record.message.clone()));

        let stack_key = record.stacktrace.as_ref().map(|_| keys.stacktrace.as_str());
        let mut renamed = Vec::new();
        for field in &record.fields {
            let reserved = object.contains_key(&field.key) || stack_key == Some(field.key.as_str());
            let key = if reserved {
                let key = format!("{COLLISION_PREFIX}{}", field.key);
                renamed.push(key.clone());
                key
            } else {
                field.key.clone()
            };
            object.insert(key, self.field_value(field));
        }
        if !renamed.is_empty() {
            warn!(fields = ?renamed, "structured fields collide with record keys and were renamed");
        }

        if let Some(stack) = &record.stacktrace {
            object.insert(keys.stacktrace.clone(), Value::String(stack.clone()));
        }

        Value::Object(object).to_string()
    }

    fn encode_console(&self, record: &LogRecord) -> String {
        let mut parts = vec![value_text(&self.format_time(record.timestamp))];
        parts.push(self.format_level(record.level));
        if let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) {
            parts.push(name.to_string());
        }
        if let Some(caller) = &record.caller {
            parts.push(self.format_caller(caller));
        }
        parts.push(record.message.clone());
        if !record.fields.is_empty() {
            let fields: Map<String, Value> = record
                .fields
                .iter()
                .map(|f| (f.key.clone(), self.field_value(f)))
                .collect();
            parts.push(Value::Object(fields).to_string());
        }

        let mut line = parts.join("\t");
        if let Some(stack) = &record.stacktrace {
            line.push_str(&self.config.line_ending);
            line.push_str(stack.trim_end());
        }
        line
    }

    /// Level text in the configured format.
    pub fn format_level(&self, level: Level) -> String {
        match self.config.level_format {
            LevelFormat::Lowercase => level.as_str().to_string(),
            LevelFormat::Capital => level.as_capital_str().to_string(),
            LevelFormat::LowercaseColor => colorize(level, level.as_str()),
            LevelFormat::CapitalColor => colorize(level, level.as_capital_str()),
        }
    }

    /// Timestamp in the configured format and time zone.
    pub fn format_time(&self, at: DateTime<Utc>) -> Value {
        match self.time_zone {
            TimeZoneMode::Utc => render_time(&self.config.time_format, &at),
            TimeZoneMode::Local => render_time(&self.config.time_format, &at.with_timezone(&Local)),
        }
    }

    /// Duration in the configured format.
    pub fn format_duration(&self, d: std::time::Duration) -> Value {
        match self.config.duration_format {
            DurationFormat::Nanos => Value::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            DurationFormat::Seconds => float(d.as_secs_f64()),
            DurationFormat::Millis => Value::from(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            DurationFormat::Text => Value::String(format!("{d:?}")),
        }
    }

    /// Call site in the configured format.
    pub fn format_caller(&self, caller: &crate::domain::models::Caller) -> String {
        match self.config.caller_format {
            CallerFormat::Short => caller.short(),
            CallerFormat::Full => caller.full(),
        }
    }

    fn field_value(&self, field: &Field) -> Value {
        match &field.value {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Uint(u) => Value::from(*u),
            FieldValue::Float(f) => float(*f),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Duration(d) => self.format_duration(*d),
            FieldValue::Time(t) => self.format_time(*t),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

fn colorize(level: Level, text: &str) -> String {
    let style = match level {
        Level::Trace => Style::new().cyan(),
        Level::Debug => Style::new().magenta(),
        Level::Info => Style::new().blue(),
        Level::Warn => Style::new().yellow(),
        Level::Error => Style::new().red(),
        Level::Panic => Style::new().red().bold(),
    };
    style.force_styling(true).apply_to(text).to_string()
}

/// Non-finite floats have no JSON number form and are emitted as text.
fn float(f: f64) -> Value {
    Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_time<Tz>(format: &TimeFormat, at: &DateTime<Tz>) -> Value
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match format {
        TimeFormat::Millis => Value::String(millis_text(at)),
        TimeFormat::Rfc3339 => Value::String(at.to_rfc3339()),
        TimeFormat::EpochSeconds => {
            float(at.timestamp() as f64 + f64::from(at.timestamp_subsec_nanos()) / 1e9)
        }
        TimeFormat::EpochMillis => Value::from(at.timestamp_millis()),
        TimeFormat::EpochNanos => Value::from(at.timestamp_nanos_opt().unwrap_or_default()),
        TimeFormat::Custom(pattern) => {
            let mut out = String::new();
            if write!(out, "{}", at.format(pattern)).is_err() {
                return Value::String(millis_text(at));
            }
            Value::String(out)
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS.mmm` with the sub-second part truncated.
fn millis_text<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let millis = (at.nanosecond() / 1_000_000).min(999);
    format!("{}.{millis:03}", at.format("%Y-%m-%d %H:%M:%S"))
}
