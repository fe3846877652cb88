//! Subscriber installation.
//!
//! Logs go to stderr or to daily-rolled files, never stdout: stdout carries
//! plans, reports, and `--json` audit output.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

/// File name prefix for rolled log files.
pub const LOG_FILE_PREFIX: &str = "deskhand.log";

/// How each event is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for reading while debugging a plan.
    Pretty,
    /// One short line per event.
    #[default]
    Compact,
    /// One JSON object per line, with the current span.
    Json,
    /// One line with span context.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}' (expected pretty, compact, json or full)"
            ))),
        }
    }
}

/// Where events are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error, colored when it is a terminal.
    #[default]
    Stderr,
    /// Daily-rolled files in this directory, without color codes.
    Files(PathBuf),
}

/// What to log and where.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base filter, e.g. `info`.
    pub level: String,
    /// Rendering.
    pub format: LogFormat,
    /// Destination.
    pub target: LogTarget,
    /// Extra filter directives such as `deskhand_llm=debug`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Log at `level` to stderr in the compact format.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
        }
    }

    /// Use `format`.
    #[must_use]
    pub fn with_format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Write to daily-rolled files under `directory`.
    #[must_use]
    pub fn with_file_logging(self, directory: impl Into<PathBuf>) -> Self {
        Self {
            target: LogTarget::Files(directory.into()),
            ..self
        }
    }

    fn ansi(&self) -> bool {
        matches!(self.target, LogTarget::Stderr)
    }

    /// `RUST_LOG`, when present and parseable, replaces `level`. Directives
    /// apply either way.
    fn filter(&self, rust_log: Option<&str>) -> TelemetryResult<EnvFilter> {
        let base = match rust_log.map(EnvFilter::try_new) {
            Some(Ok(filter)) => filter,
            _ => EnvFilter::try_new(&self.level).map_err(|e| {
                TelemetryError::ConfigError(format!("invalid log level '{}': {e}", self.level))
            })?,
        };

        let mut filter = base;
        for directive in &self.directives {
            let parsed = directive.parse().map_err(|e| {
                TelemetryError::ConfigError(format!("invalid directive '{directive}': {e}"))
            })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    fn layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer().with_writer(writer).with_ansi(self.ansi());
        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Json => layer.json().with_current_span(true).boxed(),
            LogFormat::Full => layer.boxed(),
        }
    }
}

/// Flushes file logging when dropped. Keep it alive until exit.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid level or directive, an uncreatable log directory, or
/// when a subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<LogGuard> {
    let filter = config.filter(std::env::var("RUST_LOG").ok().as_deref())?;

    let (writer, worker) = match &config.target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
        LogTarget::Files(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
            (BoxMakeWriter::new(writer), Some(guard))
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(config.layer(writer))
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))?;

    Ok(LogGuard { _worker: worker })
}
