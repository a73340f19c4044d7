//! Installer — materialize the manifest's dependencies with the package manager.
//!
//! `DependencyInstaller` abstracts the package-manager call for testability.
//! `PackageManagerInstaller` runs the real command; `MockInstaller` is used in tests.
//!
//! There is no retry here: a failed install is reported once and the operator
//! re-runs the command by hand.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;

use crate::checker::resolve_program;
use crate::config::DEFAULT_MANIFEST_FILE;
use crate::log_component;

/// Result of one install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub succeeded: bool,
    /// Text captured from the package manager (stderr on failure, stdout on success).
    pub diagnostic_output: String,
}

impl InstallOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            diagnostic_output: output.into(),
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            diagnostic_output: diagnostic.into(),
        }
    }
}

/// Abstracts the package manager's install operation.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    /// Install the dependencies declared by the manifest in `project_dir`.
    async fn install(&self, project_dir: &Path) -> InstallOutcome;

    /// The command line an operator would type to do the same by hand.
    fn command_line(&self) -> String;
}

/// Installer that shells out to a package manager.
#[derive(Debug, Clone)]
pub struct PackageManagerInstaller {
    program: String,
    args: Vec<String>,
    manifest_file: String,
}

impl PackageManagerInstaller {
    pub fn new(program: &str, args: &[&str], manifest_file: &str) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            manifest_file: manifest_file.to_string(),
        }
    }

    /// `npm install` against `package.json`.
    pub fn npm() -> Self {
        Self::new("npm", &["install"], DEFAULT_MANIFEST_FILE)
    }

    pub fn with_manifest_file(mut self, manifest_file: &str) -> Self {
        self.manifest_file = manifest_file.to_string();
        self
    }
}

#[async_trait]
impl DependencyInstaller for PackageManagerInstaller {
    async fn install(&self, project_dir: &Path) -> InstallOutcome {
        let manifest = project_dir.join(&self.manifest_file);
        if !manifest.is_file() {
            return InstallOutcome::failure(format!(
                "No {} found in {}",
                self.manifest_file,
                project_dir.display()
            ));
        }

        let command_line = self.command_line();
        log_component!(info, "installer", "Running package manager", command = command_line.as_str());

        let output = tokio::process::Command::new(resolve_program(&self.program))
            .args(&self.args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return InstallOutcome::failure(format!("Failed to run {}: {}", command_line, e));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            log_component!(info, "installer", "Dependencies installed");
            return InstallOutcome::success(stdout);
        }

        tracing::warn!(component = "installer", status = %output.status, "Package manager failed");
        let diagnostic = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("{} exited with {}", command_line, output.status)
        };
        InstallOutcome::failure(diagnostic)
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Mock installer for tests.
#[cfg(test)]
pub struct MockInstaller {
    pub outcome: InstallOutcome,
    pub calls: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl MockInstaller {
    pub fn success() -> Self {
        Self {
            outcome: InstallOutcome::success("added 42 packages"),
            calls: Default::default(),
        }
    }

    pub fn failure(msg: &str) -> Self {
        Self {
            outcome: InstallOutcome::failure(msg),
            calls: Default::default(),
        }
    }

    pub fn with_call_log(mut self, calls: std::sync::Arc<std::sync::Mutex<Vec<String>>>) -> Self {
        self.calls = calls;
        self
    }
}

#[cfg(test)]
#[async_trait]
impl DependencyInstaller for MockInstaller {
    async fn install(&self, _project_dir: &Path) -> InstallOutcome {
        self.calls.lock().unwrap().push("install".to_string());
        self.outcome.clone()
    }

    fn command_line(&self) -> String {
        "npm install".to_string()
    }
}
