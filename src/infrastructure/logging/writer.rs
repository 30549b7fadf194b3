//! Time-bucketed rotating file writer
//!
//! Every write checks the bucket for the current wall-clock time. When it
//! differs from the bucket of the open file, the file for the new bucket is
//! opened first and only then swapped in, so a failed open leaves the
//! previous file active. The bucket check, the swap and the append all run
//! under one mutex; the retention sweep triggered by a rotation runs after
//! the mutex is released. The open file is recorded with the sweeper so that
//! no sweep, periodic ones included, deletes it.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;

use super::diagnostics::ErrorOutput;
use super::retention::RetentionSweeper;
use super::rotation::RotationPolicy;
use crate::domain::errors::{ConfigResult, WriterError, WriterResult};
use crate::domain::models::LoggerConfig;
use crate::domain::ports::{Clock, LogSink, SystemClock};

struct OpenFile {
    file: File,
    path: PathBuf,
    bucket: NaiveDateTime,
}

enum WriterState {
    Closed,
    Open(OpenFile),
}

/// Append-only sink that cuts over to a new file at every bucket boundary.
pub struct RotatingWriter {
    policy: Arc<RotationPolicy>,
    clock: Arc<dyn Clock>,
    sweeper: RetentionSweeper,
    error_output: ErrorOutput,
    state: Mutex<WriterState>,
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("template", &self.policy.path_template())
            .field("current", &self.current_path())
            .finish_non_exhaustive()
    }
}

impl RotatingWriter {
    /// Writer driven by the system clock.
    pub fn new(policy: RotationPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Writer whose buckets and retention follow `clock`.
    pub fn with_clock(policy: RotationPolicy, clock: Arc<dyn Clock>) -> Self {
        let policy = Arc::new(policy);
        Self {
            sweeper: RetentionSweeper::new(Arc::clone(&policy), Arc::clone(&clock)),
            policy,
            clock,
            error_output: ErrorOutput::disabled(),
            state: Mutex::new(WriterState::Closed),
        }
    }

    /// Report sweep and flush failures to `error_output` as well as `tracing`.
    #[must_use]
    pub fn with_error_output(mut self, error_output: ErrorOutput) -> Self {
        self.sweeper = self.sweeper.with_error_output(error_output.clone());
        self.error_output = error_output;
        self
    }

    /// Writer for the rotation settings in `config`.
    pub fn from_config(config: &LoggerConfig, clock: Arc<dyn Clock>) -> ConfigResult<Self> {
        let error_output = ErrorOutput::from_target(&config.error_output)?;
        Self::from_config_with_error_output(config, clock, error_output)
    }

    /// Same as [`RotatingWriter::from_config`] with an already opened error
    /// output.
    pub fn from_config_with_error_output(
        config: &LoggerConfig,
        clock: Arc<dyn Clock>,
        error_output: ErrorOutput,
    ) -> ConfigResult<Self> {
        let policy = RotationPolicy::builder(config.base_path.as_str(), config.file_name.as_str())
            .interval_str(config.interval.as_str())
            .division(config.division.as_str())
            .max_age(config.max_age())
            .time_zone(config.time_zone)
            .build()?;
        Ok(Self::with_clock(policy, clock).with_error_output(error_output))
    }

    /// Policy this writer rotates by.
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Sweeper sharing this writer's policy, clock and active file, for
    /// periodic use.
    pub fn sweeper(&self) -> RetentionSweeper {
        self.sweeper.clone()
    }

    /// Path of the file currently open, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        match &*self.lock_state() {
            WriterState::Open(open) => Some(open.path.clone()),
            WriterState::Closed => None,
        }
    }

    /// Append one record, rotating first if the bucket changed.
    pub fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        let rotated = {
            let mut state = self.lock_state();
            let rotated = self.rotate_if_needed(&mut state)?;

            let WriterState::Open(open) = &mut *state else {
                return Err(WriterError::WriteFailed(io::Error::other("log file is not open")));
            };
            open.file.write_all(bytes).map_err(WriterError::WriteFailed)?;

            rotated.then(|| open.path.clone())
        };

        if let Some(active) = rotated {
            self.sweep_after_rotation(&active);
        }

        Ok(())
    }

    /// Run a retention sweep now, skipping the active file.
    pub fn sweep_expired(&self) -> WriterResult<Vec<PathBuf>> {
        let active = self.current_path();
        self.sweeper.sweep(active.as_deref())
    }

    /// Flush the open file and ask the OS to persist it.
    pub fn sync(&self) -> WriterResult<()> {
        let mut state = self.lock_state();
        if let WriterState::Open(open) = &mut *state {
            open.file.flush().map_err(WriterError::WriteFailed)?;
            open.file.sync_data().map_err(WriterError::WriteFailed)?;
        }
        Ok(())
    }

    /// Flush and release the open file. A later write reopens it.
    pub fn close(&self) -> WriterResult<()> {
        let mut state = self.lock_state();
        if let WriterState::Open(mut open) = std::mem::replace(&mut *state, WriterState::Closed) {
            self.sweeper.mark_active(None);
            open.file.flush().map_err(WriterError::WriteFailed)?;
            debug!(path = %open.path.display(), "closed log file");
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` when a new file was swapped in.
    fn rotate_if_needed(&self, state: &mut WriterState) -> WriterResult<bool> {
        let bucket = self.policy.bucket_start(self.clock.now());
        if matches!(state, WriterState::Open(open) if open.bucket == bucket) {
            return Ok(false);
        }

        let path = self.policy.render(&bucket);
        let file = open_append(&path)
            .map_err(|source| WriterError::RotationFailed { path: path.clone(), source })?;
        self.sweeper.mark_active(Some(path.clone()));

        if let WriterState::Open(mut previous) = std::mem::replace(
            state,
            WriterState::Open(OpenFile {
                file,
                path: path.clone(),
                bucket,
            }),
        ) {
            if let Err(e) = previous.file.flush() {
                let context = format!("failed to flush rotated log file {}", previous.path.display());
                self.error_output.report(self.clock.now(), &context, &e);
            }
            debug!(from = %previous.path.display(), to = %path.display(), "rotated log file");
        } else {
            debug!(path = %path.display(), "opened log file");
        }

        Ok(true)
    }

    fn sweep_after_rotation(&self, active: &Path) {
        if let Err(e) = self.sweeper.sweep(Some(active)) {
            self.error_output
                .report(self.clock.now(), "retention sweep after rotation failed", &e);
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl LogSink for RotatingWriter {
    fn write(&self, bytes: &[u8]) -> WriterResult<()> {
        Self::write(self, bytes)
    }

    fn sync(&self) -> WriterResult<()> {
        Self::sync(self)
    }

    fn close(&self) -> WriterResult<()> {
        Self::close(self)
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.lock_state();
        if let WriterState::Open(open) = &mut *state {
            open.file.flush()?;
        }
        Ok(())
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut &*self)
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = &'a Self;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::IntervalClass;
    use crate::domain::ports::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn writer(temp_dir: &TempDir, interval: IntervalClass, clock: &ManualClock) -> RotatingWriter {
        let policy = RotationPolicy::builder(temp_dir.path().to_string_lossy(), "test.log")
            .interval(interval)
            .build()
            .unwrap();
        RotatingWriter::with_clock(policy, Arc::new(clock.clone()))
    }

    fn log_files(temp_dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_first_write_opens_file() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let writer = writer(&temp_dir, IntervalClass::Day, &clock);

        assert!(writer.current_path().is_none());
        writer.write(b"hello\n").unwrap();

        let expected = temp_dir.path().join("2024-03-05-test.log");
        assert_eq!(writer.current_path(), Some(expected.clone()));
        assert_eq!(fs::read_to_string(expected).unwrap(), "hello\n");
    }

    #[test]
    fn test_rotation_on_bucket_change() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 59, 30).unwrap());
        let writer = writer(&temp_dir, IntervalClass::Hour, &clock);

        writer.write(b"a\n").unwrap();
        clock.advance(Duration::seconds(20));
        writer.write(b"b\n").unwrap();
        clock.advance(Duration::seconds(20));
        writer.write(b"c\n").unwrap();

        assert_eq!(
            log_files(&temp_dir),
            vec!["2024-03-05-10-test.log", "2024-03-05-11-test.log"]
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("2024-03-05-10-test.log")).unwrap(),
            "a\nb\n"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("2024-03-05-11-test.log")).unwrap(),
            "c\n"
        );
    }

    #[test]
    fn test_close_then_write_appends() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let writer = writer(&temp_dir, IntervalClass::Day, &clock);

        writer.write(b"one\n").unwrap();
        writer.close().unwrap();
        assert!(writer.current_path().is_none());

        writer.write(b"two\n").unwrap();
        writer.sync().unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("2024-03-05-test.log")).unwrap(),
            "one\ntwo\n"
        );
    }

    #[test]
    fn test_rotation_failure_keeps_previous_file() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let writer = writer(&temp_dir, IntervalClass::Day, &clock);

        writer.write(b"before\n").unwrap();

        // A directory squatting on the next bucket's file name blocks the open.
        fs::create_dir(temp_dir.path().join("2024-03-06-test.log")).unwrap();
        clock.advance(Duration::days(1));

        let err = writer.write(b"lost?\n").unwrap_err();
        assert!(matches!(err, WriterError::RotationFailed { .. }));
        assert_eq!(
            writer.current_path(),
            Some(temp_dir.path().join("2024-03-05-test.log"))
        );
    }

    #[test]
    fn test_io_write_impl() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let mut writer = writer(&temp_dir, IntervalClass::Minute, &clock);

        writeln!(writer, "formatted {}", 42).unwrap();
        writer.flush().unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("2024-03-05-10-00-test.log")).unwrap(),
            "formatted 42\n"
        );
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let writer = Arc::new(writer(&temp_dir, IntervalClass::Day, &clock));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let line = format!("{}\n", format!("w{i}-{j}-").repeat(20));
                        writer.write(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(temp_dir.path().join("2024-03-05-test.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 400);
        for line in lines {
            let first = line.split_inclusive('-').take(2).collect::<String>();
            assert_eq!(line, first.repeat(20));
        }
    }
}
