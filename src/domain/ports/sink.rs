//! Byte sinks that encoded records are written to.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::errors::{WriterError, WriterResult};

/// Append-only byte sink that encoded records are written to.
///
/// Each call to [`LogSink::write`] carries exactly one encoded record and
/// must land in the sink whole.
pub trait LogSink: Send + Sync {
    /// Append one encoded record.
    fn write(&self, bytes: &[u8]) -> WriterResult<()>;

    /// Flush buffered bytes down to the OS.
    fn sync(&self) -> WriterResult<()>;

    /// Flush and release any underlying handle.
    fn close(&self) -> WriterResult<()>;
}

/// Sink writing to the process stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        io::stdout()
            .lock()
            .write_all(bytes)
            .map_err(WriterError::WriteFailed)
    }

    fn sync(&self) -> WriterResult<()> {
        io::stdout().flush().map_err(WriterError::WriteFailed)
    }

    fn close(&self) -> WriterResult<()> {
        self.sync()
    }
}

/// Sink writing to the process stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        io::stderr()
            .lock()
            .write_all(bytes)
            .map_err(WriterError::WriteFailed)
    }

    fn sync(&self) -> WriterResult<()> {
        io::stderr().flush().map_err(WriterError::WriteFailed)
    }

    fn close(&self) -> WriterResult<()> {
        self.sync()
    }
}

/// In-memory sink that keeps every record, one entry per write.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far, decoded lossily as UTF-8.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| String::from_utf8_lossy(r).into_owned())
            .collect()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes.to_vec());
        Ok(())
    }

    fn sync(&self) -> WriterResult<()> {
        Ok(())
    }

    fn close(&self) -> WriterResult<()> {
        Ok(())
    }
}
