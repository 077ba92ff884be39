#![forbid(unsafe_code)]

//! Structured logging bootstrap.
//!
//! The layout engine only emits `tracing` spans and events; hosts decide
//! where they go. This module builds a `tracing-subscriber` pipeline from a
//! small [`LogConfig`] so that embedders (and tests) get the same filter and
//! formatting conventions:
//!
//! - `CASEMENT_LOG` holds an `EnvFilter` directive string
//!   (default: `casement_layout=info,casement_core=info`).
//! - `CASEMENT_LOG_FORMAT` selects `compact` (default) or `json`.
//!
//! Installing a global subscriber is optional; the engine never requires one.

use std::str::FromStr;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying the filter directives.
pub const LOG_FILTER_ENV: &str = "CASEMENT_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "CASEMENT_LOG_FORMAT";

/// Filter used when no directive is configured.
pub const DEFAULT_LOG_FILTER: &str = "casement_layout=info,casement_core=info";

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// Newline-delimited JSON objects, one per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" | "" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat {
                value: other.to_string(),
            }),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError> {
        let filter = lookup(LOG_FILTER_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let format = match lookup(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self { filter, format })
    }

    /// Override the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Override the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Errors raised while configuring logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("unknown log format {value:?} (expected \"compact\" or \"json\")")]
    UnknownFormat { value: String },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build a subscriber for the given configuration without installing it.
///
/// Useful with `tracing::subscriber::with_default` for scoped capture.
pub fn build_subscriber(
    config: &LogConfig,
) -> Result<Box<dyn Subscriber + Send + Sync + 'static>, LoggingError> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format {
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    };
    Ok(subscriber)
}

/// Build and install the process-wide subscriber.
pub fn try_init(config: &LogConfig) -> Result<(), LoggingError> {
    let subscriber = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!(filter = %config.filter, format = ?config.format, "logging initialised");
    Ok(())
}
