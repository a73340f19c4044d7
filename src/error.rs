//! Error types for preflight
//!
//! This module defines the error taxonomy of a preflight run. Uses `thiserror`
//! for ergonomic error handling with automatic `Display` and `Error` trait
//! implementations.
//!
//! The first three run variants are fatal and end the run with exit code 1.
//! The two smoke-test variants are soft: they are rendered as warnings and
//! never change the exit code.

use thiserror::Error;

/// Where operators are sent when Node.js itself is missing.
pub const NODE_INSTALL_URL: &str = "https://nodejs.org/";

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for preflight operations.
#[derive(Error, Debug)]
pub enum PreflightError {
    /// The primary runtime is not on the search path.
    #[error("{name} is not installed")]
    MissingRuntime {
        /// Display name of the runtime (e.g. "Node.js")
        name: String,
        /// Where to get it
        install_url: String,
    },

    /// The package manager is not on the search path.
    #[error("{name} is not installed")]
    MissingPackageManager {
        /// Display name of the package manager (e.g. "npm")
        name: String,
        /// Where to get it
        install_url: String,
    },

    /// The package manager did not report success.
    #[error("Dependency installation failed: {diagnostic}")]
    InstallFailure {
        /// Command the operator should re-run by hand
        command: String,
        /// Text captured from the package manager
        diagnostic: String,
    },

    /// The smoke test was still running at the deadline. Expected.
    #[error("Smoke test still running after {timeout_ms}ms (expected for long-running services)")]
    SmokeTestTimeout { timeout_ms: u64 },

    /// The smoke test exited unsuccessfully before the deadline.
    #[error("Smoke test failed: {reason}")]
    SmokeTestFailure { reason: String },

    /// Invalid configuration override
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (package.json) parse errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PreflightError {
    /// Returns `true` if this error ends the run with a failure exit code.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PreflightError::SmokeTestTimeout { .. } | PreflightError::SmokeTestFailure { .. }
        )
    }

    /// Remediation hint shown under the error line, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            PreflightError::MissingRuntime { install_url, .. }
            | PreflightError::MissingPackageManager { install_url, .. } => {
                Some(format!("Install it from {}", install_url))
            }
            PreflightError::InstallFailure { command, .. } => {
                Some(format!("Try running `{}` manually", command))
            }
            PreflightError::SmokeTestFailure { .. } => {
                Some("Dependencies are installed; check the service entry point".to_string())
            }
            _ => None,
        }
    }
}

/// A specialized `Result` type for preflight operations.
pub type Result<T> = std::result::Result<T, PreflightError>;
