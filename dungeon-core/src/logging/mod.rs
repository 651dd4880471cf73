//! Structured logging for the dungeon core.
//!
//! - Level-based filtering with per-module overrides
//! - `TimingSpan` guards around layout generation and grid rebuilds
//! - Idempotent initialization, safe to call from FFI hosts and Bevy apps

use std::str::FromStr;
use std::sync::Once;
use std::time::Instant;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<crate::config::DungeonConfig>()
            .map(|c| c.logging.clone())
            .unwrap_or_default();
        init_tracing(&config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Numeric level used across the C ABI; unknown ids mean info
    pub fn from_id(id: u32) -> Self {
        match id {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("dungeon_core::generation".to_string(), LogLevel::Info),
                ("dungeon_core::grid".to_string(), LogLevel::Info),
                ("dungeon_core::collision".to_string(), LogLevel::Warn),
                ("dungeon_core::bridge".to_string(), LogLevel::Warn),
            ],
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            default_level: level,
            ..Default::default()
        }
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initialize the global subscriber. First call wins; `RUST_LOG` overrides
/// the configured filter.
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let config = config.clone();
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .compact();

        // Bevy's LogPlugin may already own the global subscriber
        let _ = subscriber.try_init();
    });
}

/// Entered span that reports its elapsed time at debug level when dropped
pub struct TimingSpan {
    name: String,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        let span = tracing::info_span!("operation", name = name);
        Self {
            name: name.to_string(),
            started: Instant::now(),
            _span: span.entered(),
        }
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        tracing::debug!(
            operation = %self.name,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "operation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_id() {
        assert_eq!(LogLevel::from_id(0), LogLevel::Trace);
        assert_eq!(LogLevel::from_id(3), LogLevel::Warn);
        assert_eq!(LogLevel::from_id(4), LogLevel::Error);
        assert_eq!(LogLevel::from_id(99), LogLevel::Info);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("dungeon_core::generation=info"));
        assert!(filter.contains("dungeon_core::collision=warn"));
        assert!(filter.contains("dungeon_core::bridge=warn"));
    }

    #[test]
    fn test_config_json_uses_lowercase_levels() {
        let config = TracingConfig::with_level(LogLevel::Trace);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"trace\""));
        let restored: TracingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);

        let partial: TracingConfig = serde_json::from_str(r#"{"default_level":"warn"}"#).unwrap();
        assert_eq!(partial.default_level, LogLevel::Warn);
        assert_eq!(partial.module_filters.len(), 4);
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing_default();
        init_tracing(&TracingConfig::with_level(LogLevel::Debug));
    }

    #[test]
    fn test_timing_span() {
        init_tracing_default();
        {
            let _span = TimingSpan::new("test_operation");
            let sum: u64 = (0..100).sum();
            assert!(sum > 0);
        }
    }
}
