//! Encoder configuration: field keys plus the formatting strategies for
//! times, levels, durations and call sites.

use serde::{Deserialize, Serialize};

use super::keys::KeyConfig;

/// Record layout on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// One JSON object per line
    #[default]
    Json,
    /// Tab-separated header followed by the fields as a JSON object
    Console,
}

/// How timestamps are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// `YYYY-MM-DD HH:MM:SS.mmm`, milliseconds truncated
    #[default]
    Millis,
    /// RFC 3339 with the zone offset
    Rfc3339,
    /// Float seconds since the Unix epoch
    EpochSeconds,
    /// Integer milliseconds since the Unix epoch
    EpochMillis,
    /// Integer nanoseconds since the Unix epoch
    EpochNanos,
    /// Arbitrary strftime pattern
    Custom(String),
}

/// How levels are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelFormat {
    /// `info`
    #[default]
    Lowercase,
    /// `info` with ANSI colour
    LowercaseColor,
    /// `INFO`
    Capital,
    /// `INFO` with ANSI colour
    CapitalColor,
}

impl LevelFormat {
    /// Whether the format adds ANSI colour.
    pub const fn is_colored(self) -> bool {
        matches!(self, Self::LowercaseColor | Self::CapitalColor)
    }

    /// Same casing with ANSI colour added.
    #[must_use]
    pub const fn colored(self) -> Self {
        match self {
            Self::Lowercase | Self::LowercaseColor => Self::LowercaseColor,
            Self::Capital | Self::CapitalColor => Self::CapitalColor,
        }
    }
}

/// How duration fields are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationFormat {
    /// Integer nanoseconds
    #[default]
    Nanos,
    /// Floating-point seconds
    Seconds,
    /// Integer milliseconds
    Millis,
    /// Human readable, e.g. `1.5s`
    Text,
}

/// How call sites are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerFormat {
    /// `dir/file.rs:line`
    #[default]
    Short,
    /// Full source path and line
    Full,
}

/// Complete encoder description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Record layout
    pub encoding: Encoding,
    /// Keys for the fixed record parts
    pub keys: KeyConfig,
    /// Timestamp rendering
    pub time_format: TimeFormat,
    /// Level rendering
    pub level_format: LevelFormat,
    /// Duration field rendering
    pub duration_format: DurationFormat,
    /// Call site rendering
    pub caller_format: CallerFormat,
    /// Appended after every record
    pub line_ending: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Json,
            keys: KeyConfig::default(),
            time_format: TimeFormat::Millis,
            level_format: LevelFormat::Lowercase,
            duration_format: DurationFormat::Nanos,
            caller_format: CallerFormat::Short,
            line_ending: "\n".to_string(),
        }
    }
}

impl EncoderConfig {
    /// Preset with durations as float seconds, for production JSON output.
    pub fn production() -> Self {
        Self {
            duration_format: DurationFormat::Seconds,
            ..Self::default()
        }
    }

    /// Preset for a terminal: console layout with coloured levels.
    pub fn console() -> Self {
        Self {
            encoding: Encoding::Console,
            level_format: LevelFormat::LowercaseColor,
            ..Self::default()
        }
    }

    /// Fill empty keys and an empty line ending with defaults.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.keys = self.keys.with_defaults();
        if self.line_ending.is_empty() {
            self.line_ending = "\n".to_string();
        }
        self
    }
}
