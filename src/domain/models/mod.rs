//! Domain models: configuration schema, intervals, levels and records.

pub mod config;
pub mod encoder_config;
pub mod interval;
pub mod keys;
pub mod level;
pub mod record;

pub use config::{LoggerConfig, TimeZoneMode};
pub use encoder_config::{
    CallerFormat, DurationFormat, EncoderConfig, Encoding, LevelFormat, TimeFormat,
};
pub use interval::{IntervalClass, Placeholder};
pub use keys::KeyConfig;
pub use level::Level;
pub use record::{Caller, Field, FieldValue, LogRecord};
