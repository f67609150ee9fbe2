//! Logging configuration

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::errors::SlipwayError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// Enable JSON format on stdout
    pub json_format: bool,

    /// Also write logs to a daily-rotated file
    pub log_to_file: bool,

    /// Log directory for file output
    pub log_dir: PathBuf,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            json_format: false,
            log_to_file: false,
            log_dir: PathBuf::from("/var/log/slipway"),
        }
    }
}

/// Initialize logging
///
/// The returned guard must be held for the lifetime of the process when
/// file output is enabled, or buffered log lines are lost on exit.
pub fn init_logging(options: LogOptions) -> Result<Option<WorkerGuard>, SlipwayError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let (file_layer, guard) = if options.log_to_file {
        let appender = tracing_appender::rolling::daily(&options.log_dir, "slipway.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    if options.stdout {
        if options.json_format {
            subscriber
                .with(fmt::layer().json())
                .try_init()
                .map_err(|e| SlipwayError::ConfigError(e.to_string()))?;
        } else {
            subscriber
                .with(fmt::layer())
                .try_init()
                .map_err(|e| SlipwayError::ConfigError(e.to_string()))?;
        }
    } else {
        subscriber
            .try_init()
            .map_err(|e| SlipwayError::ConfigError(e.to_string()))?;
    }

    Ok(guard)
}
