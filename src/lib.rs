//! Logweave - time-bucketed structured logging
//!
//! Logweave writes structured log records to files named after fixed
//! wall-clock buckets (minute, hour, day, month, year), deletes files whose
//! bucket has aged out, and gives application code a leveled logger that
//! tags records with a request correlation id.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Configuration schema, records, errors and ports
//! - **Infrastructure Layer** (`infrastructure`): Config loading, rotation, encoding and the logger
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashMap;
//! use logweave::{ConfigLoader, Field, Logger};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let logger = Logger::from_config(&config)?;
//!
//!     let mut request: HashMap<String, String> = HashMap::new();
//!     logger.info(Some(&mut request), "order placed", vec![Field::new("order_id", 42)])?;
//!     logger.sync()?;
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::errors::{ConfigError, LogError, WriterError};
pub use domain::models::{
    CallerFormat, DurationFormat, EncoderConfig, Encoding, Field, FieldValue, IntervalClass,
    KeyConfig, Level, LevelFormat, LogRecord, LoggerConfig, TimeFormat, TimeZoneMode,
};
pub use domain::ports::{
    Clock, CorrelationContext, LogSink, ManualClock, MemorySink, StderrSink, StdoutSink,
    SystemClock,
};
pub use infrastructure::config::ConfigLoader;
pub use infrastructure::logging::{
    init_tracing, ErrorOutput, FileSink, Logger, LoggerBuilder, RecordEncoder, RetentionSweeper,
    RotatingWriter, RotationPolicy, TracingGuard,
};
