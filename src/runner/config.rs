//! Runtime configuration file parsing.

use std::fs;
use std::path::Path;

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::heap::HeapConfig;
use crate::runner::logging::{self, LogFormat, LogLevel, LogOptions};

/// Settings a [`Runtime`](crate::runner::api::Runtime) is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Name of the root class every class descends from.
    pub root_class_name: String,
    pub heap: HeapConfig,
    /// Whether plain call sites bind a prefix when given too few arguments.
    pub implicit_partial: bool,
    pub log: LogOptions,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        RuntimeConfig {
            root_class_name: "Object".to_string(),
            heap: HeapConfig::default(),
            implicit_partial: true,
            log: LogOptions::default(),
        }
    }

    pub fn with_max_instances(mut self, limit: usize) -> Self {
        self.heap = HeapConfig::with_limit(limit);
        self
    }

    pub fn with_implicit_partial(mut self, enabled: bool) -> Self {
        self.implicit_partial = enabled;
        self
    }

    /// The `[logging]` section with `NOVA_LOG_LEVEL` / `NOVA_LOG_FORMAT` applied.
    pub fn effective_log_options(&self) -> LogOptions {
        self.log.with_env_overrides()
    }

    /// Install the process-wide subscriber from [`RuntimeConfig::effective_log_options`].
    pub fn init_logging(&self) {
        logging::init_logging(&self.effective_log_options());
    }

    /// Load configuration from a TOML file.
    ///
    /// Expected format:
    /// ```toml
    /// [runtime]
    /// root_class = "Object"
    /// max_instances = 100000
    /// implicit_partial = true
    ///
    /// [logging]
    /// level = "debug"
    /// format = "json"
    /// ```
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let content = fs::read_to_string(path)
            .map_err(|e| RuntimeError::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse the line-oriented subset of TOML shown in [`RuntimeConfig::load`].
    pub fn parse(content: &str) -> Result<Self, RuntimeError> {
        let mut config = RuntimeConfig::new();
        let mut section = String::new();

        for (index, raw) in content.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let (key, value) = Self::parse_entry(line).ok_or_else(|| {
                RuntimeError::ConfigError(format!("line {}: expected `key = value`", index + 1))
            })?;

            match (section.as_str(), key) {
                ("runtime", "root_class") => {
                    if value.is_empty() {
                        return Err(RuntimeError::ConfigError(format!(
                            "line {}: root_class must not be empty",
                            index + 1
                        )));
                    }
                    config.root_class_name = value.to_string();
                }
                ("runtime", "max_instances") => {
                    let limit = value.parse::<usize>().map_err(|_| {
                        RuntimeError::ConfigError(format!(
                            "line {}: max_instances must be a non-negative integer",
                            index + 1
                        ))
                    })?;
                    config.heap = HeapConfig::with_limit(limit);
                }
                ("runtime", "implicit_partial") => {
                    config.implicit_partial = parse_bool(value).ok_or_else(|| {
                        RuntimeError::ConfigError(format!(
                            "line {}: implicit_partial must be true or false",
                            index + 1
                        ))
                    })?;
                }
                ("logging", "level") => {
                    config.log.level = LogLevel::parse(value).ok_or_else(|| {
                        RuntimeError::ConfigError(format!("line {}: unknown log level '{}'", index + 1, value))
                    })?;
                }
                ("logging", "format") => {
                    config.log.format = LogFormat::parse(value).ok_or_else(|| {
                        RuntimeError::ConfigError(format!("line {}: unknown log format '{}'", index + 1, value))
                    })?;
                }
                // Unknown keys are ignored so newer files still load.
                _ => {}
            }
        }

        Ok(config)
    }

    /// Split `key = value`, dropping quotes around the value.
    fn parse_entry(line: &str) -> Option<(&str, &str)> {
        let mut parts = line.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim().trim_matches('"');
        if key.is_empty() {
            return None;
        }
        Some((key, value))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
