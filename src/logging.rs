// src/logging.rs

//! Logging setup for `stepgraph` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level passed in (usually `[logging].level` from the config)
//! 2. `STEPGRAPH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR.

use serde::Deserialize;
use tracing_subscriber::fmt;

use crate::errors::{Result, StepGraphError};

/// Log level as accepted in configuration files.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Initialise the global logging subscriber.
///
/// Fails if a global subscriber was already installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = match level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("STEPGRAPH_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| StepGraphError::Other(anyhow::anyhow!(e)))?;

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level_str("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str(" WARN "), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("Trace"), Some(tracing::Level::TRACE));
        assert_eq!(parse_level_str("verbose"), None);
        assert_eq!(parse_level_str(""), None);
    }

    #[test]
    fn config_levels_map_to_tracing_levels() {
        assert_eq!(level_from_log_level(LogLevel::Error), tracing::Level::ERROR);
        assert_eq!(level_from_log_level(LogLevel::Warn), tracing::Level::WARN);
        assert_eq!(level_from_log_level(LogLevel::Info), tracing::Level::INFO);
        assert_eq!(level_from_log_level(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(level_from_log_level(LogLevel::Trace), tracing::Level::TRACE);
    }

    #[test]
    fn config_level_names_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Section {
            level: LogLevel,
        }

        let section: Section = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(section.level, LogLevel::Warn);
        assert!(toml::from_str::<Section>("level = \"WARN\"").is_err());
    }

    #[test]
    fn second_initialisation_is_an_error() {
        // The only test in this binary that installs a global subscriber.
        init_logging(Some(LogLevel::Error)).unwrap();
        assert!(matches!(
            init_logging(None),
            Err(StepGraphError::Other(_))
        ));
    }
}
