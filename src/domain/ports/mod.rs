//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the logging core depends on:
//! - Clock: wall-clock source used for bucketing and retention
//! - CorrelationContext: request-scoped get/set of the correlation id
//! - LogSink: append-only byte sink receiving encoded records
//!
//! These traits keep the rotation engine independent of the system clock,
//! of any web framework, and of the concrete output.

pub mod clock;
pub mod correlation;
pub mod sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use correlation::CorrelationContext;
pub use sink::{LogSink, MemorySink, StderrSink, StdoutSink};
