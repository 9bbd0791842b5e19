//! Logging System
//!
//! Structured logging using the `tracing` crate. The filter sits behind a
//! reload layer so the level can be changed while the service runs; the
//! returned [`LogHandle`] is what components receive instead of a global.

use crate::error::ServiceError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Disable all log output when false
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn (or warning), error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (when output is "file")
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, terminal destinations only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

/// Runtime handle to the active log filter.
///
/// Cloned into the service so callers can change verbosity without touching
/// process-wide state directly.
#[derive(Clone)]
pub struct LogHandle {
    reload: Option<reload::Handle<EnvFilter, Registry>>,
    level: Arc<RwLock<String>>,
}

impl LogHandle {
    /// A handle not attached to any subscriber. Level changes are validated
    /// and recorded only.
    pub fn detached(level: &str) -> Self {
        Self {
            reload: None,
            level: Arc::new(RwLock::new(normalize_level(level))),
        }
    }

    /// Current level directive.
    pub fn level(&self) -> String {
        self.level.read().clone()
    }

    /// Replace the active filter with `level`.
    pub fn set_level(&self, level: &str) -> Result<String, ServiceError> {
        let normalized = normalize_level(level);
        let filter = EnvFilter::try_new(&normalized).map_err(|e| {
            ServiceError::ConfigError(format!("Invalid log level '{}': {}", level, e))
        })?;
        if let Some(handle) = &self.reload {
            handle
                .reload(filter)
                .map_err(|e| ServiceError::ConfigError(format!("Failed to reload log filter: {}", e)))?;
        }
        *self.level.write() = normalized.clone();
        Ok(normalized)
    }
}

/// Initialize the logging system and return the handle for runtime changes.
///
/// Priority order (highest to lowest):
/// 1. Environment variables (RECOVERD_LOG, RECOVERD_LOG_FORMAT, RECOVERD_LOG_OUTPUT)
/// 2. The supplied configuration (CLI flags already merged in)
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<LogHandle, ServiceError> {
    let (filter, level) = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    let writer = match output {
        Output::Stdout => BoxMakeWriter::new(std::io::stdout),
        Output::Stderr => BoxMakeWriter::new(std::io::stderr),
        Output::File => {
            let log_file = config
                .and_then(|c| c.file.clone())
                .unwrap_or_else(|| PathBuf::from("recoverd.log"));
            if let Some(parent) = log_file.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ServiceError::ConfigError(format!("Failed to create log directory: {}", e))
                    })?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .map_err(|e| {
                    ServiceError::ConfigError(format!(
                        "Failed to open log file {:?}: {}",
                        log_file, e
                    ))
                })?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
    };

    let fmt_layer: Box<dyn Layer<FilteredRegistry> + Send + Sync> = if format == "json" {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(use_color && output != Output::File)
            .with_writer(writer)
            .boxed()
    };

    Registry::default()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ServiceError::ConfigError(format!("Failed to install logger: {}", e)))?;

    Ok(LogHandle {
        reload: Some(reload_handle),
        level: Arc::new(RwLock::new(level)),
    })
}

/// Map accepted level spellings onto `tracing` directives.
pub fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        other => other.to_string(),
    }
}

/// Build the filter from environment or config. Returns the filter and the
/// directive string it was built from.
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<(EnvFilter, String), ServiceError> {
    if let Ok(directive) = std::env::var("RECOVERD_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directive) {
            return Ok((filter, directive));
        }
    }

    if config.map(|c| !c.enabled).unwrap_or(false) {
        return Ok((EnvFilter::new("off"), "off".to_string()));
    }

    let level = normalize_level(config.map(|c| c.level.as_str()).unwrap_or("info"));
    let mut filter = EnvFilter::try_new(&level)
        .map_err(|e| ServiceError::ConfigError(format!("Invalid log level '{}': {}", level, e)))?;

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, normalize_level(module_level));
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| ServiceError::ConfigError(format!("Invalid log directive: {}", e)))?,
            );
        }
    }

    Ok((filter, level))
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ServiceError> {
    if let Ok(format) = std::env::var("RECOVERD_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(ServiceError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, ServiceError> {
    if let Ok(output) = std::env::var("RECOVERD_LOG_OUTPUT") {
        return parse_output(&output);
    }
    parse_output(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output(output: &str) -> Result<Output, ServiceError> {
    match output {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File),
        _ => Err(ServiceError::ConfigError(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr', or 'file')",
            output
        ))),
    }
}
