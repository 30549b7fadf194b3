//! Output keys for the fixed parts of a record.

use serde::{Deserialize, Serialize};

/// Default key for the timestamp.
pub const DEFAULT_TIME_KEY: &str = "time";
/// Default key for the level.
pub const DEFAULT_LEVEL_KEY: &str = "level";
/// Default key for the logger name.
pub const DEFAULT_NAME_KEY: &str = "log";
/// Default key for the call site.
pub const DEFAULT_CALLER_KEY: &str = "caller";
/// Default key for the message.
pub const DEFAULT_MESSAGE_KEY: &str = "message";
/// Default key for the stack trace.
pub const DEFAULT_STACKTRACE_KEY: &str = "trace";

/// Keys emitted for the fixed parts of every record.
///
/// Missing or empty entries fall back to the defaults above. Every role is
/// filled independently of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Timestamp key
    pub time: String,
    /// Level key
    pub level: String,
    /// Call site key
    pub caller: String,
    /// Message key
    pub message: String,
    /// Stack trace key
    pub stacktrace: String,
    /// Logger name key
    pub name: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            time: DEFAULT_TIME_KEY.to_string(),
            level: DEFAULT_LEVEL_KEY.to_string(),
            caller: DEFAULT_CALLER_KEY.to_string(),
            message: DEFAULT_MESSAGE_KEY.to_string(),
            stacktrace: DEFAULT_STACKTRACE_KEY.to_string(),
            name: DEFAULT_NAME_KEY.to_string(),
        }
    }
}

impl KeyConfig {
    /// Replace empty keys with their defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        fill(&mut self.time, DEFAULT_TIME_KEY);
        fill(&mut self.level, DEFAULT_LEVEL_KEY);
        fill(&mut self.caller, DEFAULT_CALLER_KEY);
        fill(&mut self.message, DEFAULT_MESSAGE_KEY);
        fill(&mut self.stacktrace, DEFAULT_STACKTRACE_KEY);
        fill(&mut self.name, DEFAULT_NAME_KEY);
        self
    }
}

fn fill(key: &mut String, default: &str) {
    if key.trim().is_empty() {
        *key = default.to_string();
    }
}
