//! Structured logging with tracing
//!
//! One global subscriber: an `EnvFilter` read from `INVR_LOG` (falling back
//! to the configured level), a stderr layer in plain or JSON form and an
//! optional daily-rolling file layer.

use crate::constants::{LOG_FILE_STEM, LOG_FILTER_ENV};
use crate::error_ext::ErrorContext;
use invr_domain::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;

pub use crate::config::LoggingConfig;
use tracing::{Level, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
///
/// Fails when the level is unknown or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers = vec![stderr_layer(config.json_format)];
    if let Some(path) = &config.file_output {
        layers.push(file_layer(path, config)?);
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Configuration {
            message: format!("Failed to install log subscriber: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!(%level, json = config.json_format, "Logging initialized");
    Ok(())
}

// stdout carries command output
fn stderr_layer(json: bool) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json { layer.json().boxed() } else { layer.boxed() }
}

fn file_layer(path: &Path, config: &LoggingConfig) -> Result<BoxedLayer> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(LOG_FILE_STEM);
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(stem)
        .max_log_files(config.max_files.max(1))
        .build(directory)
        .config_context(format!("Cannot open log file in {}", directory.display()))?;

    let layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(true);
    Ok(if config.json_format {
        layer.json().boxed()
    } else {
        layer.boxed()
    })
}

/// Parse a configured level; `warning` is accepted for `warn`
pub fn parse_log_level(level: &str) -> Result<Level> {
    let normalized = if level.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        level
    };
    normalized.parse::<Level>().map_err(|_| {
        Error::configuration(format!(
            "Invalid log level: {level}. Use trace, debug, info, warn, or error"
        ))
    })
}

/// Log configuration loading status
pub fn log_config_loaded(config_path: &Path, success: bool) {
    if success {
        info!("Configuration loaded from {}", config_path.display());
    } else {
        warn!("Configuration file not found: {}", config_path.display());
    }
}

/// Log the outcome of a rule set load or reload
pub fn log_rules_loaded(origin: &str, result: std::result::Result<usize, &Error>) {
    match result {
        Ok(count) => info!(origin = origin, rules = count, "Rule set loaded"),
        Err(e) => warn!(
            origin = origin,
            error = %e,
            "Rule set load failed, keeping previous rules"
        ),
    }
}
