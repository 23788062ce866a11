//! Log configuration for embedders.
//!
//! The runtime only emits `tracing` events (`debug!` for class, method and
//! box mutations, `trace!` for dispatch decisions). Installing a subscriber is
//! left to the embedder; [`init_logging`] is a ready-made one.

use std::env;
use std::fmt;

pub const LOG_LEVEL_ENV: &str = "NOVA_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "NOVA_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "compact" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogOptions {
    pub const DEFAULT: LogOptions = LogOptions {
        level: LogLevel::Warn,
        format: LogFormat::Text,
    };

    /// `self` with `NOVA_LOG_LEVEL` / `NOVA_LOG_FORMAT` applied on top.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let level = env::var(LOG_LEVEL_ENV).ok();
        let format = env::var(LOG_FORMAT_ENV).ok();
        self.with_overrides(level.as_deref(), format.as_deref())
    }

    /// Unparseable values leave the current setting in place.
    #[must_use]
    pub fn with_overrides(mut self, level: Option<&str>, format: Option<&str>) -> Self {
        if let Some(level) = level.and_then(LogLevel::parse) {
            self.level = level;
        }
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        self
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions::DEFAULT
    }
}

/// Install a global stderr subscriber once per process. `RUST_LOG`, when set,
/// takes precedence over `options.level`.
pub fn init_logging(options: &LogOptions) {
    use std::sync::OnceLock;
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("nova={}", options.level)));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);
        let installed = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Text => tracing::subscriber::set_global_default(builder.compact().finish()),
        };
        if installed.is_err() {
            tracing::debug!("a global subscriber was already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels_and_formats() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
        assert!(LogLevel::Trace > LogLevel::Info);
    }

    #[test]
    fn test_overrides_ignore_garbage() {
        let opts = LogOptions::DEFAULT.with_overrides(Some("trace"), Some("yaml"));
        assert_eq!(opts.level, LogLevel::Trace);
        assert_eq!(opts.format, LogFormat::Text);
    }
}
