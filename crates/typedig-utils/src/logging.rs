//! # Logging Utilities
//!
//! `tracing` subscriber setup for typedig.
//!
//! Output goes to stderr (stdout is left to the caller's rendered
//! declarations) and optionally to a daily-rolled file. Records are either
//! pretty-printed or emitted as JSON lines.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (`debug`, `typedig_core=trace`, ...)
//! - `TYPEDIG_LOG_FORMAT`: `pretty` (default) or `json`
//! - `TYPEDIG_LOG_FILE`: optional log file path
//!
//! ## Example
//!
//! ```rust,no_run
//! use typedig_utils::init_logging;
//!
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("walking debug info");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const LOG_FORMAT_ENV: &str = "TYPEDIG_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "TYPEDIG_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable, the default
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" | "dev" => Ok(LogFormat::Pretty),
            "json" | "prod" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default
    #[default]
    Info,
    Debug,
    /// Per-member walker decisions
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
        match s.trim().to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Everything needed to build the subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// `EnvFilter` directives; `None` falls back to `level`.
    pub filter: Option<String>,
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `RUST_LOG`, `TYPEDIG_LOG_FORMAT` and `TYPEDIG_LOG_FILE`.
    ///
    /// An unparsable format is an error rather than a silent default.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError>
    {
        let format = match lookup(LOG_FORMAT_ENV) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => LogFormat::default(),
        };
        Ok(Self {
            filter: lookup("RUST_LOG").filter(|value| !value.trim().is_empty()),
            level: LogLevel::default(),
            format,
            file: lookup(LOG_FILE_ENV)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError>
    {
        match &self.filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| LoggingError::InvalidLevel(format!("{directives}: {err}")))
            }
            None => Ok(EnvFilter::new(Level::from(self.level).to_string())),
        }
    }
}

/// Initialize logging from the environment
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the program when `TYPEDIG_LOG_FILE` is set.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed, an environment value
/// is invalid, or the log directory cannot be created.
pub fn init_logging() -> Result<Option<WorkerGuard>, LoggingError>
{
    init_logging_from_config(&LogConfig::from_env()?)
}

/// Initialize console logging with an explicit level and format
///
/// `RUST_LOG` is ignored.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    let config = LogConfig {
        level,
        format,
        ..LogConfig::default()
    };
    init_logging_from_config(&config).map(|_| ())
}

/// Initialize logging from an explicit configuration
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed, the filter does not
/// parse, or the log directory cannot be created.
pub fn init_logging_from_config(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError>
{
    let console_filter = config.env_filter()?;

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(console_filter)
            .boxed(),
    };

    let Some(file_path) = &config.file else {
        Registry::default()
            .with(console_layer)
            .try_init()
            .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
        return Ok(None);
    };

    let (directory, file_name) = split_log_path(file_path)?;
    std::fs::create_dir_all(&directory)?;
    let file_appender = tracing_appender::rolling::daily(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = config.env_filter()?;
    let file_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_filter(file_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(file_filter)
            .boxed(),
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(Some(guard))
}

/// Directory and file-name prefix for the rolling appender.
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError>
{
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, PathBuf::from(file_name)))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level or filter directive
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// The log file path has no file name
    #[error("Invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
