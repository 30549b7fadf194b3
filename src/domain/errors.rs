//! Error types for policy construction and runtime writes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Join a list of paths for display: `a.log, b.log`.
fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while building a rotation policy or a logger.
///
/// All variants are fatal to construction: no usable policy or logger is
/// returned alongside them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Base path or file name is blank
    #[error("Log base path and file name cannot be empty")]
    EmptyPath,

    /// Interval text names no interval class
    #[error("Invalid rotation interval: {0}. Must be one of: minute, hour, day, month, year")]
    InvalidInterval(String),

    /// Level text names no level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error, panic")]
    InvalidLevel(String),

    /// A directory or file could not be created
    #[error("Failed to create log directory {}: {source}", path.display())]
    PathCreationFailed {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the rotating writer at runtime.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The file for a new bucket could not be opened; the previous file
    /// stays active
    #[error("Failed to open rotated log file {}: {source}", path.display())]
    RotationFailed {
        /// File that could not be opened
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Appending or flushing a record failed
    #[error("Failed to write log record: {0}")]
    WriteFailed(#[source] io::Error),

    /// Recoverable: reported as a diagnostic, never interrupts writes.
    #[error("Retention sweep failed for [{}]: {source}", format_paths(files))]
    RetentionSweepFailed {
        /// First deletion failure
        #[source]
        source: io::Error,
        /// Every file that could not be deleted
        files: Vec<PathBuf>,
    },
}

impl WriterError {
    /// Whether normal operation can continue after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::RetentionSweepFailed { .. })
    }
}

impl From<WriterError> for io::Error {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::WriteFailed(source) => source,
            other => Self::other(other),
        }
    }
}

/// Top-level error for building a logger straight from configuration.
#[derive(Debug, Error)]
pub enum LogError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure while writing
    #[error(transparent)]
    Writer(#[from] WriterError),
}

/// Result of building a policy or logger.
pub type ConfigResult<T> = Result<T, ConfigError>;
/// Result of a runtime write.
pub type WriterResult<T> = Result<T, WriterError>;
