//! Logging infrastructure
//!
//! Time-bucketed file rotation and structured record output:
//! - Rotation policy and bucket arithmetic
//! - Rotating file writer with retention sweeps
//! - JSON and console record encoding
//! - Leveled logger facade with correlation ids
//! - Error output for the logger's own failures
//! - Bridge for routing `tracing` events into rotated files

pub mod diagnostics;
pub mod encoder;
pub mod logger;
pub mod retention;
pub mod rotation;
pub mod tracing_setup;
pub mod writer;

pub use diagnostics::{ErrorOutput, FileSink};
pub use encoder::RecordEncoder;
pub use logger::{Logger, LoggerBuilder};
pub use retention::RetentionSweeper;
pub use rotation::{RotationPolicy, RotationPolicyBuilder};
pub use tracing_setup::{build_subscriber, init_tracing, TracingGuard};
pub use writer::RotatingWriter;
