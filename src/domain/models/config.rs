//! Configuration schema for a logger and its rotating file output.

use serde::{Deserialize, Serialize};

use super::encoder_config::EncoderConfig;
use super::level::Level;

/// Clock used to bucket records and to name rotated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    /// Coordinated universal time
    #[default]
    Utc,
    /// The host's local time zone
    Local,
}

/// Main configuration structure for a logger
///
/// One schema covers every preset; fields added later must carry a serde
/// default so that older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggerConfig {
    /// Directory receiving the rotated files
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Literal suffix after the timestamp segment
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Rotation interval (minute, hour, day, month, year)
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Separator between timestamp components
    #[serde(default = "default_division")]
    pub division: String,

    /// Retention in seconds; 0 keeps files forever
    #[serde(default)]
    pub max_age_secs: u64,

    /// Clock buckets, file names and encoded times use
    #[serde(default)]
    pub time_zone: TimeZoneMode,

    /// Minimum level (trace, debug, info, warn, error, panic)
    #[serde(default = "default_level")]
    pub level: String,

    /// Emitted as an `app` field on every record when non-empty
    #[serde(default)]
    pub app_name: String,

    /// Also write records to stdout using the console layout
    #[serde(default)]
    pub console_output: bool,

    /// Field carrying the correlation id; `None` disables correlation
    #[serde(default = "default_correlation_field")]
    pub correlation_field: Option<String>,

    /// Capture a stack trace for records at or above this level
    #[serde(default)]
    pub stacktrace_level: Option<Level>,

    /// Destination for the logger's own failures: `stderr`, `stdout`, a
    /// file path, or empty to report through `tracing` only
    #[serde(default)]
    pub error_output: String,

    /// Record layout and formatting strategies
    #[serde(default)]
    pub encoder: EncoderConfig,
}

fn default_base_path() -> String {
    "./logs".to_string()
}

fn default_file_name() -> String {
    "app.log".to_string()
}

fn default_interval() -> String {
    "day".to_string()
}

fn default_division() -> String {
    "-".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_correlation_field() -> Option<String> {
    Some("trace_log_id".to_string())
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            file_name: default_file_name(),
            interval: default_interval(),
            division: default_division(),
            max_age_secs: 0,
            time_zone: TimeZoneMode::default(),
            level: default_level(),
            app_name: String::new(),
            console_output: false,
            correlation_field: default_correlation_field(),
            stacktrace_level: None,
            error_output: String::new(),
            encoder: EncoderConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Retention as a duration; `None` when files are kept forever.
    pub const fn max_age(&self) -> Option<std::time::Duration> {
        if self.max_age_secs == 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(self.max_age_secs))
        }
    }

    /// Correlation field, treating an empty name as disabled.
    pub fn correlation_field(&self) -> Option<&str> {
        self.correlation_field
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}
