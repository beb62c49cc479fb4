//! # Logging Utilities
//!
//! Logging infrastructure for Vantage using `tracing`.
//!
//! The dashboard owns stdout, so the binary usually logs to a file only and
//! opts into console logging (on stderr) explicitly. Both modes accept the
//! same format and level configuration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vantage_utils::init_logging;
//!
//! // Keep the guard alive for as long as logs should be flushed.
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Replay started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log filter (e.g., `RUST_LOG=debug`, `RUST_LOG=vantage_core=trace`)
//! - `VANTAGE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `VANTAGE_LOG_FILE`: Optional extra log file for console mode

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (per-register diffs)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Keeps the background log writer alive.
///
/// Dropping the guard flushes pending file output; hold it until exit.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _workers: Vec<WorkerGuard>,
}

/// Initialize console logging from the environment
///
/// Reads `RUST_LOG`, `VANTAGE_LOG_FORMAT` and `VANTAGE_LOG_FILE`. When a log
/// file is named, events go to both stderr and the file.
///
/// ## Errors
///
/// Returns an error if:
/// - `VANTAGE_LOG_FORMAT` holds an unknown format
/// - A global subscriber is already installed
/// - The log file directory cannot be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var("VANTAGE_LOG_FORMAT") {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::Pretty,
    };
    init_console(format, None)
}

/// Initialize console logging with an explicit level and format
///
/// The level overrides `RUST_LOG`. `VANTAGE_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file directory cannot be created.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_console(format, Some(level.into()))
}

/// Initialize file-only logging so stdout stays free for dashboard output
///
/// Logs go to `~/.vantage/YYYY-MM-DD-vantage.log`, or the same name under the
/// system temp directory when `HOME` is unset. Returns the chosen path.
///
/// ## Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_logging_to_file(level: Option<LogLevel>) -> Result<(PathBuf, LoggingGuard), LoggingError>
{
    let home = env::var_os("HOME").map(PathBuf::from);
    let log_file = default_log_path(home.as_deref(), &Utc::now().format("%Y-%m-%d").to_string());
    let format = env::var("VANTAGE_LOG_FORMAT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();

    let filter = build_filter(level.map(Into::into), env::var("RUST_LOG").ok().as_deref());
    // Date is already in the file name, so no rotation.
    let (layer, guard) = file_layer(&log_file, format, filter, false)?;
    install(vec![layer])?;
    Ok((log_file, LoggingGuard { _workers: vec![guard] }))
}

fn init_console(format: LogFormat, explicit: Option<Level>) -> Result<LoggingGuard, LoggingError>
{
    let rust_log = env::var("RUST_LOG").ok();
    let mut layers = vec![fmt_layer(format, io::stderr, true, build_filter(explicit, rust_log.as_deref()))];
    let mut guard = LoggingGuard::default();

    if let Some(path) = env::var_os("VANTAGE_LOG_FILE").map(PathBuf::from) {
        let filter = build_filter(explicit, rust_log.as_deref());
        let (layer, worker) = file_layer(&path, format, filter, true)?;
        layers.push(layer);
        guard._workers.push(worker);
    }

    install(layers)?;
    Ok(guard)
}

/// Where file-only logging writes, given the home directory and a date stamp.
fn default_log_path(home: Option<&Path>, date: &str) -> PathBuf
{
    let dir = match home {
        Some(home) => home.join(".vantage"),
        None => env::temp_dir(),
    };
    dir.join(format!("{date}-vantage.log"))
}

/// Explicit level beats `RUST_LOG`, which beats `info`.
fn build_filter(explicit: Option<Level>, rust_log: Option<&str>) -> EnvFilter
{
    if let Some(level) = explicit {
        return EnvFilter::new(level.to_string());
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(Level::INFO.to_string()))
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => base.with_ansi(ansi).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat, filter: EnvFilter, rotate: bool) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let name = path.file_name().unwrap_or_default();

    let appender = if rotate {
        tracing_appender::rolling::daily(&dir, name)
    } else {
        tracing_appender::rolling::never(&dir, name)
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((fmt_layer(format, writer, false, filter), guard))
}

fn install(layers: Vec<BoxedLayer>) -> Result<(), LoggingError>
{
    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A global subscriber was already set
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("prod").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_default_log_path()
    {
        let path = default_log_path(Some(Path::new("/home/dev")), "2026-10-19");
        assert_eq!(path, PathBuf::from("/home/dev/.vantage/2026-10-19-vantage.log"));

        let fallback = default_log_path(None, "2026-10-19");
        assert_eq!(fallback, env::temp_dir().join("2026-10-19-vantage.log"));
    }

    #[test]
    fn test_filter_precedence()
    {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(build_filter(Some(Level::DEBUG), Some("warn")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_filter(None, Some("vantage_core=trace")).max_level_hint(), Some(LevelFilter::TRACE));
        assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
    }
}
