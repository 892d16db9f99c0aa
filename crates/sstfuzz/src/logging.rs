//! Logging configuration for the harness
//!
//! Uses the `tracing` framework. Output goes to stderr by default so it
//! interleaves with libFuzzer's own reporting, or to a daily-rolling file.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stderr
    Stderr,
    /// Output to a file with daily rotation
    File(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter, used when `RUST_LOG` is unset
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: LogOutput::Stderr,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Create config with debug level, tracing every harness stage
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Create config with warn level
    pub fn warn() -> Self {
        Self::default()
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Install this configuration as the global subscriber.
    ///
    /// Returns a guard for file output that must be kept alive for buffered
    /// records to be flushed. If a global subscriber is already installed,
    /// the existing one stays in place.
    ///
    /// ```rust,no_run
    /// use sstfuzz::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().init();
    /// ```
    pub fn init(self) -> Option<WorkerGuard> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        match self.output {
            LogOutput::Stderr => {
                let layer = fmt::layer().with_writer(std::io::stderr);
                let _ = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.compact())
                        .try_init(),
                };
                None
            }
            LogOutput::File(path) => {
                let file_appender = tracing_appender::rolling::daily(
                    path.parent().unwrap_or_else(|| Path::new(".")),
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("sstfuzz.log"),
                );
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

                let _ = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.compact())
                        .try_init(),
                };
                Some(guard)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert!(matches!(config.output, LogOutput::Stderr));
        assert!(matches!(config.format, LogFormat::Compact));
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::debug()
            .with_file("/tmp/sstfuzz.log")
            .with_format(LogFormat::Pretty);
        assert_eq!(config.level, "debug");
        assert!(matches!(config.output, LogOutput::File(_)));
        assert!(matches!(config.format, LogFormat::Pretty));

        let config = LogConfig::warn().with_level("sstfuzz=trace");
        assert_eq!(config.level, "sstfuzz=trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let _first = LogConfig::default().init();
        let _second = LogConfig::debug().init();
    }
}
