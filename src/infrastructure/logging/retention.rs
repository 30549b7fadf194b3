//! Retention sweep for rotated log files
//!
//! Scans the policy's base directory for files whose names follow the
//! rotation template and deletes those whose bucket ended more than
//! `max_age` ago. Files that do not match the template are never touched,
//! and neither is the file a writer is appending to.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::diagnostics::ErrorOutput;
use super::rotation::RotationPolicy;
use crate::domain::errors::{WriterError, WriterResult};
use crate::domain::ports::Clock;

/// Deletes expired rotated files for one policy.
///
/// Clones share the record of the active file, so a clone handed to
/// [`RetentionSweeper::run_periodic`] keeps skipping whatever file the
/// owning writer currently appends to.
#[derive(Clone)]
pub struct RetentionSweeper {
    policy: Arc<RotationPolicy>,
    clock: Arc<dyn Clock>,
    active: Arc<Mutex<Option<PathBuf>>>,
    error_output: ErrorOutput,
}

impl std::fmt::Debug for RetentionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionSweeper")
            .field("policy", &self.policy)
            .field("active", &self.active_file())
            .finish_non_exhaustive()
    }
}

impl RetentionSweeper {
    /// Sweeper for `policy`, judging expiry against `clock`.
    pub fn new(policy: Arc<RotationPolicy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            active: Arc::new(Mutex::new(None)),
            error_output: ErrorOutput::disabled(),
        }
    }

    /// Also report periodic sweep failures to `error_output`.
    #[must_use]
    pub fn with_error_output(mut self, error_output: ErrorOutput) -> Self {
        self.error_output = error_output;
        self
    }

    /// Policy whose files are swept.
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Record the file currently being appended to; it is never deleted.
    pub fn mark_active(&self, path: Option<PathBuf>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = path;
    }

    /// File recorded by [`RetentionSweeper::mark_active`].
    pub fn active_file(&self) -> Option<PathBuf> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a file name belongs to a bucket that has fully aged out
    ///
    /// A file expires once the latest bucket it can hold ended at least
    /// `max_age` ago. A cutoff outside the representable range expires
    /// nothing.
    pub fn is_expired(&self, name: &str, now: DateTime<Utc>) -> bool {
        let Some(retention) = self.policy.retention() else {
            return false;
        };
        let Some(bucket_end) = self.policy.latest_bucket_end(name) else {
            return false;
        };
        let Some(cutoff) = self.policy.wall_clock(now).checked_sub_signed(retention) else {
            return false;
        };
        bucket_end <= cutoff
    }

    /// Delete expired files
    ///
    /// Never touches `active` or the file recorded with
    /// [`RetentionSweeper::mark_active`]. Every candidate is attempted even if some deletions fail;
    /// the failures are returned together afterwards.
    ///
    /// # Returns
    /// Paths that were deleted
    pub fn sweep(&self, active: Option<&Path>) -> WriterResult<Vec<PathBuf>> {
        if self.policy.retention().is_none() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let base_dir = self.policy.base_dir();
        let tracked = self.active_file();
        let protected = |path: &Path| active == Some(path) || tracked.as_deref() == Some(path);

        let entries = fs::read_dir(base_dir).map_err(|source| WriterError::RetentionSweepFailed {
            source,
            files: vec![base_dir.to_path_buf()],
        })?;

        let mut removed = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;

        for entry in entries.flatten() {
            let path = entry.path();
            if protected(path.as_path()) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.is_expired(name, now) {
                continue;
            }
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "deleted expired log file");
                    removed.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete expired log file");
                    failed.push(path);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(source) = first_error {
            return Err(WriterError::RetentionSweepFailed {
                source,
                files: failed,
            });
        }

        if !removed.is_empty() {
            debug!(count = removed.len(), "retention sweep completed");
        }

        Ok(removed)
    }

    /// Run the sweep on a fixed schedule
    ///
    /// This is a long-running async task that should be spawned. Failures
    /// go to the error output and the loop keeps going.
    pub async fn run_periodic(&self, every: std::time::Duration) {
        let mut interval_timer = tokio::time::interval(every);

        loop {
            interval_timer.tick().await;

            let sweeper = self.clone();
            let outcome = tokio::task::spawn_blocking(move || sweeper.sweep(None)).await;

            match outcome {
                Ok(Ok(removed)) => {
                    if !removed.is_empty() {
                        info!(count = removed.len(), "periodic retention sweep completed");
                    }
                }
                Ok(Err(e)) => self
                    .error_output
                    .report(self.clock.now(), "periodic retention sweep failed", &e),
                Err(e) => self
                    .error_output
                    .report(self.clock.now(), "periodic retention sweep panicked", &e),
            }
        }
    }
}
