//! Leveled logger facade over encoded sinks
//!
//! A [`Logger`] filters by level, tags records with a request correlation
//! id, and fans each record out to every configured output. Failed writes
//! are returned to the caller and also reported to the error output.

use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::Arc;

use uuid::Uuid;

use super::diagnostics::ErrorOutput;
use super::encoder::RecordEncoder;
use super::writer::RotatingWriter;
use crate::domain::errors::{ConfigResult, LogError, WriterResult};
use crate::domain::models::{
    Caller, EncoderConfig, Encoding, Field, Level, LogRecord, LoggerConfig, TimeZoneMode,
};
use crate::domain::ports::{Clock, CorrelationContext, LogSink, StdoutSink, SystemClock};

struct Output {
    encoder: RecordEncoder,
    sink: Arc<dyn LogSink>,
}

struct LoggerCore {
    min_level: Level,
    correlation_field: Option<String>,
    initial_fields: Vec<Field>,
    stacktrace_level: Option<Level>,
    clock: Arc<dyn Clock>,
    outputs: Vec<Output>,
    error_output: ErrorOutput,
}

/// Leveled structured logger over one or more encoded sinks
///
/// Cloning is cheap; clones and [`Logger::named`] children share the same
/// sinks.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    name: Option<String>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.core.min_level)
            .field("correlation_field", &self.core.correlation_field)
            .field("outputs", &self.core.outputs.len())
            .finish()
    }
}

impl Logger {
    /// Builder writing to `sink` with the default encoder.
    pub fn builder(sink: Arc<dyn LogSink>) -> LoggerBuilder {
        LoggerBuilder::new(sink)
    }

    /// Build the rotation policy, the rotating writer and the logger in one go.
    pub fn from_config(config: &LoggerConfig) -> Result<Self, LogError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`Logger::from_config`] with buckets and timestamps taken
    /// from `clock`.
    pub fn from_config_with_clock(
        config: &LoggerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LogError> {
        let error_output = ErrorOutput::from_target(&config.error_output)?;
        let writer = RotatingWriter::from_config_with_error_output(
            config,
            Arc::clone(&clock),
            error_output.clone(),
        )?;
        Ok(Self::builder_from_config(config, Arc::new(writer))?
            .clock(clock)
            .error_output(error_output)
            .build())
    }

    /// Builder preloaded with everything in `config` except the file sink
    /// and the error output.
    pub fn builder_from_config(
        config: &LoggerConfig,
        sink: Arc<dyn LogSink>,
    ) -> ConfigResult<LoggerBuilder> {
        let min_level: Level = config.level.parse()?;

        let mut builder = LoggerBuilder::new(sink)
            .min_level(min_level)
            .encoder(config.encoder.clone())
            .time_zone(config.time_zone)
            .console_output(config.console_output)
            .correlation_field(config.correlation_field().map(str::to_string))
            .stacktrace_level(config.stacktrace_level);

        if !config.app_name.is_empty() {
            builder = builder.initial_field(Field::string("app", config.app_name.clone()));
        }

        Ok(builder)
    }

    /// Child logger whose records carry `name`, dot-joined onto any parent name.
    #[must_use]
    pub fn named(&self, name: &str) -> Self {
        let name = match &self.name {
            Some(parent) if !name.is_empty() => format!("{parent}.{name}"),
            Some(parent) => parent.clone(),
            None => name.to_string(),
        };
        Self {
            core: Arc::clone(&self.core),
            name: Some(name).filter(|n| !n.is_empty()),
        }
    }

    /// Whether records at `level` are written.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.core.min_level
    }

    /// Field the correlation id is written under, if correlation is on.
    pub fn correlation_field(&self) -> Option<&str> {
        self.core.correlation_field.as_deref()
    }

    /// Correlation id stored in `ctx`, generating and storing one if absent.
    ///
    /// Returns `None` when no correlation field is configured.
    pub fn correlation_id(&self, ctx: &mut dyn CorrelationContext) -> Option<String> {
        let field = self.core.correlation_field.as_deref()?;
        if let Some(id) = ctx.get(field) {
            return Some(id);
        }
        let id = Uuid::new_v4().simple().to_string();
        ctx.set(field, id.clone());
        Some(id)
    }

    /// Emit one record
    ///
    /// Records below the minimum level are dropped and `Ok(())` is returned.
    /// When a correlation field is configured and `ctx` is given, the
    /// correlation id becomes the first structured field.
    ///
    /// Every output is attempted; each failure goes to the error output and
    /// the first one is returned.
    #[track_caller]
    pub fn emit(
        &self,
        level: Level,
        message: &str,
        fields: Vec<Field>,
        ctx: Option<&mut dyn CorrelationContext>,
    ) -> WriterResult<()> {
        if !self.enabled(level) {
            return Ok(());
        }

        let caller = Caller::from_location(Location::caller());
        let record = self.record(level, message, fields, ctx, caller);

        let mut first_error = None;
        for output in &self.core.outputs {
            let bytes = output.encoder.encode(&record);
            if let Err(e) = output.sink.write(&bytes) {
                self.core
                    .error_output
                    .report(record.timestamp, "failed to write log record", &e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Emit at [`Level::Trace`].
    #[track_caller]
    pub fn trace(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> WriterResult<()> {
        self.emit(Level::Trace, message, fields, ctx)
    }

    /// Emit at [`Level::Debug`].
    #[track_caller]
    pub fn debug(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> WriterResult<()> {
        self.emit(Level::Debug, message, fields, ctx)
    }

    /// Emit at [`Level::Info`].
    #[track_caller]
    pub fn info(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> WriterResult<()> {
        self.emit(Level::Info, message, fields, ctx)
    }

    /// Emit at [`Level::Warn`].
    #[track_caller]
    pub fn warn(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> WriterResult<()> {
        self.emit(Level::Warn, message, fields, ctx)
    }

    /// Emit at [`Level::Error`].
    #[track_caller]
    pub fn error(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> WriterResult<()> {
        self.emit(Level::Error, message, fields, ctx)
    }

    /// Emit at [`Level::Panic`], then panic with `message`
    ///
    /// The record is written regardless of the minimum level. A failed
    /// write is reported to the error output and the panic still happens.
    #[track_caller]
    pub fn panic(
        &self,
        ctx: Option<&mut dyn CorrelationContext>,
        message: &str,
        fields: Vec<Field>,
    ) -> ! {
        let caller = Caller::from_location(Location::caller());
        let record = self.record(Level::Panic, message, fields, ctx, caller);
        for output in &self.core.outputs {
            let bytes = output.encoder.encode(&record);
            if let Err(e) = output.sink.write(&bytes).and_then(|()| output.sink.sync()) {
                self.core
                    .error_output
                    .report(record.timestamp, "failed to write panic record", &e);
            }
        }
        panic!("{message}");
    }

    /// Flush every sink.
    pub fn sync(&self) -> WriterResult<()> {
        self.core
            .outputs
            .iter()
            .try_for_each(|output| output.sink.sync())
    }

    /// Flush and release every sink.
    pub fn close(&self) -> WriterResult<()> {
        self.core
            .outputs
            .iter()
            .try_for_each(|output| output.sink.close())
    }

    fn record(
        &self,
        level: Level,
        message: &str,
        fields: Vec<Field>,
        ctx: Option<&mut dyn CorrelationContext>,
        caller: Caller,
    ) -> LogRecord {
        let core = &self.core;
        let mut all_fields = Vec::with_capacity(fields.len() + core.initial_fields.len() + 1);

        if let (Some(field), Some(ctx)) = (core.correlation_field.as_deref(), ctx) {
            if let Some(id) = self.correlation_id(ctx) {
                all_fields.push(Field::string(field, id));
            }
        }
        all_fields.extend(core.initial_fields.iter().cloned());
        all_fields.extend(fields);

        let stacktrace = core
            .stacktrace_level
            .filter(|threshold| level >= *threshold)
            .map(|_| Backtrace::force_capture().to_string());

        LogRecord {
            level,
            message: message.to_string(),
            timestamp: core.clock.now(),
            name: self.name.clone(),
            fields: all_fields,
            caller: Some(caller),
            stacktrace,
        }
    }
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    sink: Arc<dyn LogSink>,
    min_level: Level,
    encoder: EncoderConfig,
    time_zone: TimeZoneMode,
    console_output: bool,
    correlation_field: Option<String>,
    initial_fields: Vec<Field>,
    stacktrace_level: Option<Level>,
    clock: Arc<dyn Clock>,
    extra_outputs: Vec<(EncoderConfig, Arc<dyn LogSink>)>,
    error_output: ErrorOutput,
}

impl LoggerBuilder {
    /// Builder writing to `sink`: info level, default encoder, UTC, no
    /// correlation.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            min_level: Level::Info,
            encoder: EncoderConfig::default(),
            time_zone: TimeZoneMode::Utc,
            console_output: false,
            correlation_field: None,
            initial_fields: Vec::new(),
            stacktrace_level: None,
            clock: Arc::new(SystemClock),
            extra_outputs: Vec::new(),
            error_output: ErrorOutput::disabled(),
        }
    }

    /// Lowest level that is written.
    #[must_use]
    pub const fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Encoder for the primary sink and the console tee.
    #[must_use]
    pub fn encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    /// Time zone encoded timestamps are rendered in, for every output.
    #[must_use]
    pub const fn time_zone(mut self, time_zone: TimeZoneMode) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Tee records to stdout in the console layout with coloured levels.
    #[must_use]
    pub const fn console_output(mut self, enabled: bool) -> Self {
        self.console_output = enabled;
        self
    }

    /// Field the correlation id is stored and written under; `None` or a
    /// blank name disables correlation.
    #[must_use]
    pub fn correlation_field(mut self, field: Option<String>) -> Self {
        self.correlation_field = field.filter(|f| !f.trim().is_empty());
        self
    }

    /// Field added to every record after the correlation id.
    #[must_use]
    pub fn initial_field(mut self, field: Field) -> Self {
        self.initial_fields.push(field);
        self
    }

    /// Capture a stack trace for records at or above this level.
    #[must_use]
    pub const fn stacktrace_level(mut self, level: Option<Level>) -> Self {
        self.stacktrace_level = level;
        self
    }

    /// Source of record timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Additional sink with its own encoder.
    #[must_use]
    pub fn output(mut self, encoder: EncoderConfig, sink: Arc<dyn LogSink>) -> Self {
        self.extra_outputs.push((encoder, sink));
        self
    }

    /// Where failed writes are reported besides `tracing`.
    #[must_use]
    pub fn error_output(mut self, error_output: ErrorOutput) -> Self {
        self.error_output = error_output;
        self
    }

    /// Finish the logger.
    pub fn build(self) -> Logger {
        let mut outputs = vec![Output {
            encoder: RecordEncoder::new(self.encoder.clone(), self.time_zone),
            sink: self.sink,
        }];

        if self.console_output {
            let console = EncoderConfig {
                encoding: Encoding::Console,
                level_format: self.encoder.level_format.colored(),
                ..self.encoder
            };
            outputs.push(Output {
                encoder: RecordEncoder::new(console, self.time_zone),
                sink: Arc::new(StdoutSink),
            });
        }
        outputs.extend(self.extra_outputs.into_iter().map(|(encoder, sink)| Output {
            encoder: RecordEncoder::new(encoder, self.time_zone),
            sink,
        }));

        Logger {
            core: Arc::new(LoggerCore {
                min_level: self.min_level,
                correlation_field: self.correlation_field,
                initial_fields: self.initial_fields,
                stacktrace_level: self.stacktrace_level,
                clock: self.clock,
                outputs,
                error_output: self.error_output,
            }),
            name: None,
        }
    }
}
