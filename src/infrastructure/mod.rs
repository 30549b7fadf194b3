//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Configuration management (figment)
//! - Rotating file output, encoding and the logger facade
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
