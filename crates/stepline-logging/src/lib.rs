//! Logging initialization for stepline front-ends
//!
//! Wraps `tracing` and `tracing-subscriber` so every binary embedding the
//! engine configures logging the same way.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stepline_logging::{init, LogConfig, LogOutput};
//!
//! // Defaults: stdout, `info`, overridable via RUST_LOG
//! init(LogConfig::default());
//!
//! // TUI mode: stdout belongs to the UI, keep logs quiet and on stderr
//! init(LogConfig::new().default_level("warn").output(LogOutput::Stderr));
//!
//! // File logging; the guard must be held for the program's lifetime
//! let _guard = init_with_file(LogConfig::new(), Path::new("stepline.log"));
//! ```

use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

// Re-export the macros so call sites need a single import
pub use tracing::{debug, error, info, span, trace, warn, Level};

// Re-export WorkerGuard for file logging lifetime management
pub use tracing_appender::non_blocking::WorkerGuard;

/// Output destination for logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOutput {
    /// Write logs to stdout (default)
    #[default]
    Stdout,
    /// Write logs to stderr (TUI mode, stdout reserved for the UI)
    Stderr,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level filter when RUST_LOG is not set
    pub default_level: String,
    /// Where logs are written
    pub output: LogOutput,
    /// Include the emitting module path in each line
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            output: LogOutput::Stdout,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default level filter (used when RUST_LOG is not set)
    pub fn default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Set the output destination
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Include or omit the emitting module path
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level.clone()))
    }
}

/// Initialize global logging.
///
/// Safe to call once per process; a second call is a no-op because the
/// global subscriber is already set.
pub fn init(config: LogConfig) {
    let filter = config.env_filter();
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.output {
        LogOutput::Stdout => builder
            .with_ansi(std::io::stdout().is_terminal())
            .try_init(),
        LogOutput::Stderr => builder
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if result.is_err() {
        debug!("logging already initialized, keeping existing subscriber");
    }
}

/// Initialize global logging with non-blocking file output.
///
/// Returns the worker guard; dropping it flushes and stops the writer, so
/// hold it for the duration of the program.
pub fn init_with_file(config: LogConfig, path: &Path) -> WorkerGuard {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let filename = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    let appender = tracing_appender::rolling::never(directory, filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.with_target)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();

    if result.is_err() {
        debug!("logging already initialized, keeping existing subscriber");
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = LogConfig::new()
            .default_level("debug")
            .output(LogOutput::Stderr)
            .with_target(false);
        assert_eq!(config.default_level, "debug");
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(!config.with_target);
    }

    #[test]
    fn init_is_idempotent() {
        init(LogConfig::new().default_level("warn"));
        init(LogConfig::new().default_level("debug"));
    }
}
