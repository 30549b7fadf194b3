//! Bridge routing `tracing` events into rotated files.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;

use super::retention::RetentionSweeper;
use super::writer::RotatingWriter;
use crate::domain::models::{Level, LoggerConfig};
use crate::domain::ports::SystemClock;

/// Keeps the background writer of a `tracing` subscriber alive
///
/// Dropping the guard flushes whatever is still queued.
pub struct TracingGuard {
    _guard: WorkerGuard,
    path_template: String,
    sweeper: RetentionSweeper,
}

impl TracingGuard {
    /// Template the rotated files are named after.
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// Sweeper for the rotated files, for scheduling with
    /// [`RetentionSweeper::run_periodic`].
    pub fn sweeper(&self) -> RetentionSweeper {
        self.sweeper.clone()
    }
}

/// Subscriber routing `tracing` events into rotated JSON files
///
/// `RUST_LOG` overrides the configured level. When `console_output` is set,
/// events are also printed to stdout in the human-readable format.
///
/// # Errors
/// Returns an error if the level is invalid or the policy cannot be built
pub fn build_subscriber(
    config: &LoggerConfig,
) -> Result<(Box<dyn Subscriber + Send + Sync>, TracingGuard)> {
    let default_level = parse_log_level(&config.level)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy();

    let writer = RotatingWriter::from_config(config, Arc::new(SystemClock))
        .context("Failed to build rotating writer")?;
    let path_template = writer.policy().path_template().to_string();
    let sweeper = writer.sweeper();

    let (non_blocking_file, guard) = tracing_appender::non_blocking(writer);

    // File layer - always JSON for structured logging
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stdout_layer = config.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_target(true)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    Ok((
        Box::new(subscriber),
        TracingGuard {
            _guard: guard,
            path_template,
            sweeper,
        },
    ))
}

/// Install the subscriber from [`build_subscriber`] as the global default
///
/// # Errors
/// Returns an error if the subscriber cannot be built or a global default is
/// already set
pub fn init_tracing(config: &LoggerConfig) -> Result<TracingGuard> {
    let (subscriber, guard) = build_subscriber(config)?;

    tracing::subscriber::set_global_default(subscriber)
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        level = %config.level,
        template = %guard.path_template(),
        console = config.console_output,
        "tracing initialized"
    );

    Ok(guard)
}

fn parse_log_level(level: &str) -> Result<tracing::Level> {
    let level: Level = level.parse()?;
    Ok(level.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(tracing::Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(tracing::Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(tracing::Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(tracing::Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(tracing::Level::ERROR)));
        assert!(matches!(parse_log_level("panic"), Ok(tracing::Level::ERROR)));
        assert!(matches!(parse_log_level("TRACE"), Ok(tracing::Level::TRACE)));
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_subscriber_writes_json_to_rotated_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            base_path: temp_dir.path().to_string_lossy().into_owned(),
            file_name: "tracing.log".to_string(),
            ..LoggerConfig::default()
        };

        let (subscriber, guard) = temp_env::with_var_unset("RUST_LOG", || {
            build_subscriber(&config).unwrap()
        });

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(order_id = 7, "order placed");
            tracing::debug!("filtered out at info");
        });

        let sweeper = guard.sweeper();
        drop(guard);

        let files = sweeper.policy().rotated_files().unwrap();

        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["message"], "order placed");
        assert_eq!(value["fields"]["order_id"], 7);
    }

    #[test]
    fn test_build_subscriber_rejects_bad_level() {
        let config = LoggerConfig {
            level: "chatty".to_string(),
            ..LoggerConfig::default()
        };
        assert!(build_subscriber(&config).is_err());
    }
}
