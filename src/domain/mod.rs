//! Domain layer for logweave
//!
//! This module contains the configuration schema, record model, error
//! taxonomy and the ports the infrastructure layer plugs into.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ConfigError, LogError, WriterError};
