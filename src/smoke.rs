//! Smoke tester — a bounded run of the service in self-test mode.
//!
//! The probe starts `<runtime> <entry script> --test` with all output
//! suppressed and races it against a wall-clock deadline owned by the caller.
//! A service still running at the deadline is killed and reported as
//! [`SmokeTestOutcome::TimedOut`], which callers treat as a healthy start:
//! the self-test mode has no bounded exit of its own.
//!
//! The entry script is handed to the runtime unresolved; module resolution
//! (`server` → `server.js`, `lib` → `lib/index.js`) belongs to the runtime, and
//! a script it cannot find surfaces as a non-zero exit.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

use crate::checker::resolve_program;
use crate::manifest::Manifest;

/// Argument that puts the service into self-test mode.
pub const SELF_TEST_FLAG: &str = "--test";

/// Classification of one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeTestOutcome {
    /// Exited 0 before the deadline.
    Passed,
    /// Still running at the deadline; killed.
    TimedOut,
    /// Exited unsuccessfully before the deadline, or never started.
    Failed(String),
}

/// How to launch the service for a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Runtime executable (e.g. "node")
    pub program: String,
    /// Script passed to the runtime, relative to `working_dir`
    pub script: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl EntryPoint {
    /// Entry point of the manifest's `main` script in self-test mode.
    pub fn for_manifest(program: &str, project_dir: &Path, manifest: &Manifest) -> Self {
        Self {
            program: program.to_string(),
            script: PathBuf::from(manifest.entry_script()),
            args: vec![SELF_TEST_FLAG.to_string()],
            working_dir: project_dir.to_path_buf(),
        }
    }

    /// The invocation as an operator would type it.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone(), self.script.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Abstracts the probe run for testability.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    async fn probe(&self, entry: &EntryPoint, timeout: Duration) -> SmokeTestOutcome;
}

/// Probe that spawns the real service process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessProbe;

#[async_trait]
impl ServiceProbe for ProcessProbe {
    async fn probe(&self, entry: &EntryPoint, timeout: Duration) -> SmokeTestOutcome {
        let mut child = match tokio::process::Command::new(resolve_program(&entry.program))
            .arg(&entry.script)
            .args(&entry.args)
            .current_dir(&entry.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return SmokeTestOutcome::Failed(format!(
                    "failed to start `{}`: {}",
                    entry.command_line(),
                    e
                ));
            }
        };
        debug!(pid = ?child.id(), command = %entry.command_line(), ?timeout, "Smoke test started");

        // The deadline is polled first, so a probe still alive exactly at the
        // bound counts as timed out.
        let deadline = tokio::time::Instant::now() + timeout;
        let waited = tokio::select! {
            biased;
            _ = tokio::time::sleep_until(deadline) => None,
            status = child.wait() => Some(status),
        };

        match waited {
            Some(Ok(status)) if status.success() => SmokeTestOutcome::Passed,
            Some(Ok(status)) => SmokeTestOutcome::Failed(describe_exit(status)),
            Some(Err(e)) => SmokeTestOutcome::Failed(format!("failed waiting for probe: {}", e)),
            None => {
                debug!("Smoke test reached its deadline, killing probe");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill smoke-test process: {}", e);
                }
                SmokeTestOutcome::TimedOut
            }
        }
    }
}

fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with code {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {}", signal);
        }
    }
    format!("exited with {}", status)
}

/// Mock probe for tests.
#[cfg(test)]
pub struct MockServiceProbe {
    pub outcome: SmokeTestOutcome,
    pub calls: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl MockServiceProbe {
    pub fn returning(outcome: SmokeTestOutcome) -> Self {
        Self {
            outcome,
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
impl ServiceProbe for MockServiceProbe {
    async fn probe(&self, entry: &EntryPoint, _timeout: Duration) -> SmokeTestOutcome {
        self.calls
            .lock()
            .unwrap()
            .push(format!("probe:{}", entry.command_line()));
        self.outcome.clone()
    }
}
