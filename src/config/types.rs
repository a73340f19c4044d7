//! Configuration type definitions for preflight
//!
//! All types implement serde traits for JSON serialization and have sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Manifest consumed by the package manager.
pub const DEFAULT_MANIFEST_FILE: &str = "package.json";

/// Wall-clock bound for the smoke test.
pub const DEFAULT_SMOKE_TIMEOUT_MS: u64 = 5_000;

/// Main configuration struct for preflight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Project directory holding the manifest. `None` = resolve at run time.
    pub project_dir: Option<PathBuf>,
    /// Manifest file name inside the project directory
    pub manifest_file: String,
    /// Smoke-test timeout in milliseconds
    pub smoke_timeout_ms: u64,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_dir: None,
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            smoke_timeout_ms: DEFAULT_SMOKE_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// `[timestamp] [LEVEL] target message {fields}`
    Component,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "component" => Ok(LogFormat::Component),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Subscriber output format
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "warn".to_string(),
        }
    }
}
