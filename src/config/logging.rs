//! Logging configuration.

use std::str::FromStr;

use super::parse::env_or;
use super::ConfigError;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable `tracing_subscriber::fmt` output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected text or json, got '{}'", other)),
        }
    }
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
    /// Output format.
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Load configuration from environment variables.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: healthgate=debug,hyper=warn
    pub fn from_env() -> Result<Self, ConfigError> {
        let format_value = env_or("LOG_FORMAT", "text");
        let format = format_value
            .parse()
            .map_err(|error| ConfigError::Parse {
                key: "LOG_FORMAT".into(),
                value: format_value.clone(),
                error,
            })?;

        Ok(Self {
            filter: Self::resolve_log_filter(),
            service_name: env_or("SERVICE_NAME", "healthgate"),
            format,
        })
    }

    /// Resolve log filter from environment.
    fn resolve_log_filter() -> String {
        Self::filter_from(
            std::env::var("LOG_LEVEL").ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
        )
    }

    fn filter_from(log_level: Option<&str>, rust_log: Option<&str>) -> String {
        if let Some(level) = log_level {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {
                    return format!("healthgate={}", level);
                }
                _ => {
                    // Logging is not up yet
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        if let Some(filter) = rust_log {
            return filter.to_string();
        }

        "healthgate=info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "healthgate=info".to_string(),
            service_name: "healthgate".to_string(),
            format: LogFormat::Text,
        }
    }
}
