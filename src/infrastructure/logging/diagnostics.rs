//! Error output for the logger's own failures
//!
//! Sweep failures, flush failures on rotation and failed writes to an output
//! are always reported through `tracing`. When an error output is
//! configured they are also written to it as one plain line each, so they
//! are kept even when the host never installs a subscriber.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::domain::errors::{ConfigError, ConfigResult, WriterError, WriterResult};
use crate::domain::ports::{LogSink, StderrSink, StdoutSink};

/// Where internal failures are written besides `tracing`.
#[derive(Clone, Default)]
pub struct ErrorOutput {
    sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for ErrorOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorOutput")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl ErrorOutput {
    /// Report to `sink` as well as `tracing`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Report through `tracing` only.
    pub const fn disabled() -> Self {
        Self { sink: None }
    }

    /// Error output named by a config value
    ///
    /// An empty value disables it, `stderr` and `stdout` select the process
    /// streams, anything else is a file opened for appending.
    pub fn from_target(target: &str) -> ConfigResult<Self> {
        let sink: Arc<dyn LogSink> = match target.trim() {
            "" => return Ok(Self::disabled()),
            "stderr" => Arc::new(StderrSink),
            "stdout" => Arc::new(StdoutSink),
            path => Arc::new(FileSink::open(path)?),
        };
        Ok(Self::new(sink))
    }

    /// Whether a sink is attached.
    pub const fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Record one internal failure.
    pub fn report(&self, at: DateTime<Utc>, context: &str, error: &dyn fmt::Display) {
        warn!(error = %error, "{context}");

        let Some(sink) = &self.sink else {
            return;
        };
        let line = format!(
            "{}\t{context}: {error}\n",
            at.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        if let Err(e) = sink.write(line.as_bytes()) {
            warn!(error = %e, "failed to write to error output");
        }
    }
}

/// Plain append-only file, never rotated.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
            .map_err(|source| ConfigError::PathCreationFailed {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// File being appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> WriterResult<T> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut file).map_err(WriterError::WriteFailed)
    }
}

impl LogSink for FileSink {
    fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        self.with_file(|file| file.write_all(bytes))
    }

    fn sync(&self) -> WriterResult<()> {
        self.with_file(|file| {
            file.flush()?;
            file.sync_data()
        })
    }

    fn close(&self) -> WriterResult<()> {
        self.with_file(Write::flush)
    }
}
