//! Logging configuration for minjection
//!
//! Every event the container emits uses the target `minjection`. This module
//! sets up a `tracing-subscriber` for it, in JSON (production) or pretty
//! (development) form.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - Use JSON structured output
//! - `logging-pretty` - Use colorful pretty output
//!
//! # Environment
//!
//! [`LoggingBuilder::from_env`] reads `MINJECTION_LOG` (a level such as
//! `debug`) and `MINJECTION_LOG_FORMAT` (`json`, `pretty` or `compact`).
//!
//! # Example
//!
//! ```rust,ignore
//! use minjection::logging;
//!
//! logging::init();
//!
//! logging::builder()
//!     .trace()
//!     .minjection_only()
//!     .pretty()
//!     .init();
//! ```

use std::str::FromStr;
use tracing::Level;

/// Target used by every event this crate emits
pub const TARGET: &str = "minjection";

/// Environment variable holding the minimum level
pub const LEVEL_ENV: &str = "MINJECTION_LOG";

/// Environment variable holding the output format
pub const FORMAT_ENV: &str = "MINJECTION_LOG_FORMAT";

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `MINJECTION_LOG` and `MINJECTION_LOG_FORMAT`.
    ///
    /// Unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::default();
        if let Some(level) = lookup(LEVEL_ENV).and_then(|v| Level::from_str(v.trim()).ok()) {
            builder.level = level;
        }
        if let Some(format) = lookup(FORMAT_ENV).and_then(|v| v.parse().ok()) {
            builder.format = format;
        }
        builder
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (includes every resolution)
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Set log level to DEBUG (registrations and creations)
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Set log level to INFO
    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show minjection logs
    pub fn minjection_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Include file names in log output
    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    /// Include line numbers in log output
    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    /// Include thread IDs in log output
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Use JSON structured logging format
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty colorful logging format
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact single-line logging format
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// The `EnvFilter` directive this builder installs.
    pub fn directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Initialize the logging subscriber with the configured settings
    ///
    /// Does nothing if a global subscriber is already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let registry = tracing_subscriber::registry().with(filter);

        let result = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(self.with_file)
                        .with_line_number(self.with_line_number)
                        .with_thread_ids(self.with_thread_ids)
                        .with_target(true),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(self.with_file)
                        .with_line_number(self.with_line_number)
                        .with_thread_ids(self.with_thread_ids)
                        .with_target(true),
                )
                .try_init(),
            // Without `logging-json`, JSON falls back to compact lines
            _ => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_file(self.with_file)
                        .with_line_number(self.with_line_number)
                        .with_thread_ids(self.with_thread_ids)
                        .with_target(true),
                )
                .try_init(),
        };

        if let Err(err) = result {
            tracing::debug!(target: "minjection", error = %err, "Subscriber already installed");
        }
    }

    /// Initialize (no-op when subscriber features not available)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging from the environment
///
/// Format defaults to JSON if `logging-json` is enabled, pretty otherwise.
pub fn init() {
    let builder = LoggingBuilder::from_env();
    let format_set = std::env::var(FORMAT_ENV).is_ok();

    if !format_set && cfg!(not(feature = "logging-json")) {
        builder.pretty().init();
    } else {
        builder.init();
    }
}

/// Initialize JSON structured logging
///
/// # Example output
/// ```json
/// {"timestamp":"2024-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Registered service","service":"type app::Database","lifetime":"static"},"target":"minjection"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Initialize pretty colorful logging
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Initialize logging for minjection only (filters other crates)
pub fn init_minjection_only() {
    builder().minjection_only().debug().init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
        assert!(builder.target.is_none());
        assert_eq!(builder.directive(), "debug");
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .pretty()
            .with_file()
            .with_line_number()
            .minjection_only();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_file);
        assert!(builder.with_line_number);
        assert_eq!(builder.directive(), "minjection=trace");
    }

    #[test]
    fn test_from_env_overrides() {
        let builder = LoggingBuilder::from_lookup(env(&[(LEVEL_ENV, "trace"), (FORMAT_ENV, "Compact")]));
        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Compact);
    }

    #[test]
    fn test_from_env_ignores_garbage() {
        let builder = LoggingBuilder::from_lookup(env(&[(LEVEL_ENV, "loud"), (FORMAT_ENV, "xml")]));
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
