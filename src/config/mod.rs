//! Configuration management for preflight
//!
//! Configuration is intentionally small: where the project lives, what the
//! manifest is called, how long the smoke test may run, and how to log.
//! Defaults are overridden by `PREFLIGHT_*` environment variables, which the
//! CLI flags in turn override.

mod types;

pub use types::*;

use crate::error::{PreflightError, Result};
use std::path::PathBuf;
use tracing::debug;

impl Config {
    /// Build the configuration from defaults plus environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables follow the pattern: PREFLIGHT_KEY
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PREFLIGHT_PROJECT_DIR") {
            if !val.trim().is_empty() {
                self.project_dir = Some(PathBuf::from(val));
            }
        }
        if let Some(val) = lookup("PREFLIGHT_SMOKE_TIMEOUT_MS") {
            self.smoke_timeout_ms = val.trim().parse().map_err(|_| {
                PreflightError::Config(format!(
                    "PREFLIGHT_SMOKE_TIMEOUT_MS must be a number of milliseconds, got '{}'",
                    val
                ))
            })?;
        }
        if let Some(val) = lookup("PREFLIGHT_LOG_LEVEL") {
            if !val.trim().is_empty() {
                self.logging.level = val.trim().to_string();
            }
        }
        if let Some(val) = lookup("PREFLIGHT_LOG_FORMAT") {
            self.logging.format = val.parse().map_err(PreflightError::Config)?;
        }
        Ok(())
    }

    /// Resolve the directory the run operates in.
    ///
    /// Order: explicit `project_dir` (flag or env), then the executable's own
    /// directory when it holds the manifest, then the current directory.
    pub fn resolve_project_dir(&self) -> Result<PathBuf> {
        let dir = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => match exe_dir_with_manifest(&self.manifest_file) {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            },
        };

        if !dir.is_dir() {
            return Err(PreflightError::Config(format!(
                "project directory does not exist: {}",
                dir.display()
            )));
        }

        let resolved = dir.canonicalize().unwrap_or(dir);
        debug!(project_dir = %resolved.display(), "Resolved project directory");
        Ok(resolved)
    }
}

/// Directory of the running executable, if the manifest sits next to it.
fn exe_dir_with_manifest(manifest_file: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    dir.join(manifest_file).is_file().then(|| dir.to_path_buf())
}
