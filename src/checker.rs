//! Environment checker — presence and version of the required runtimes.
//!
//! `CommandProbe` abstracts the host queries for testability.
//! `SystemProbe` resolves commands against the real search path.
//! `MockProbe` is used in tests.
//!
//! Checking never mutates the host: it is a PATH lookup followed by
//! `<command> --version`.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PreflightError, NODE_INSTALL_URL};

/// Upper bound for a `--version` query.
const VERSION_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Version reported when the runtime is present but will not say which.
pub const UNKNOWN_VERSION: &str = "unknown";

// ============================================================================
// Prerequisites
// ============================================================================

/// What a prerequisite is for; decides which error a missing one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerequisiteRole {
    Runtime,
    PackageManager,
}

/// One external runtime the run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    /// Executable name looked up on the search path (e.g. "node")
    pub command: String,
    /// Name shown to the operator (e.g. "Node.js")
    pub display_name: String,
    /// Where to get it
    pub install_url: String,
    pub role: PrerequisiteRole,
    pub required: bool,
}

impl Prerequisite {
    pub fn new(
        command: &str,
        display_name: &str,
        install_url: &str,
        role: PrerequisiteRole,
    ) -> Self {
        Self {
            command: command.to_string(),
            display_name: display_name.to_string(),
            install_url: install_url.to_string(),
            role,
            required: true,
        }
    }

    /// The error reported when this prerequisite is absent.
    pub fn missing_error(&self) -> PreflightError {
        match self.role {
            PrerequisiteRole::Runtime => PreflightError::MissingRuntime {
                name: self.display_name.clone(),
                install_url: self.install_url.clone(),
            },
            PrerequisiteRole::PackageManager => PreflightError::MissingPackageManager {
                name: self.display_name.clone(),
                install_url: self.install_url.clone(),
            },
        }
    }
}

/// The runtime and its package manager, in check order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub runtime: Prerequisite,
    pub package_manager: Prerequisite,
}

impl Toolchain {
    /// Node.js with npm. npm ships with Node.js, so both point at the same installer.
    pub fn node() -> Self {
        Self {
            runtime: Prerequisite::new("node", "Node.js", NODE_INSTALL_URL, PrerequisiteRole::Runtime),
            package_manager: Prerequisite::new(
                "npm",
                "npm",
                NODE_INSTALL_URL,
                PrerequisiteRole::PackageManager,
            ),
        }
    }

    /// Prerequisites in check order.
    pub fn prerequisites(&self) -> [&Prerequisite; 2] {
        [&self.runtime, &self.package_manager]
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::node()
    }
}

/// Result of checking one prerequisite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Present(String),
    Absent,
}

impl RuntimeStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, RuntimeStatus::Present(_))
    }
}

// ============================================================================
// Probing
// ============================================================================

/// Abstracts the read-only host queries.
#[async_trait]
pub trait CommandProbe: Send + Sync {
    /// Check if a command/binary is available on the search path.
    fn is_command_available(&self, command: &str) -> bool;

    /// Human-readable version string, if the command reports one.
    async fn version(&self, command: &str) -> Option<String>;
}

/// Probe backed by the host's `PATH`.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    /// Search path override; `None` reads `PATH` at call time.
    path: Option<OsString>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a fixed search path instead of the process `PATH`.
    pub fn with_path(path: impl Into<OsString>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn resolve(&self, command: &str) -> Option<PathBuf> {
        match &self.path {
            Some(path) => find_in_path(command, path),
            None => find_in_path(command, &std::env::var_os("PATH")?),
        }
    }
}

#[async_trait]
impl CommandProbe for SystemProbe {
    fn is_command_available(&self, command: &str) -> bool {
        let found = self.resolve(command);
        debug!(command, path = ?found, "Search path lookup");
        found.is_some()
    }

    async fn version(&self, command: &str) -> Option<String> {
        let program = self.resolve(command)?;
        let mut cmd = tokio::process::Command::new(&program);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(VERSION_QUERY_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Failed to run {} --version: {}", command, e);
                return None;
            }
            Err(_) => {
                warn!("{} --version did not answer within {:?}", command, VERSION_QUERY_TIMEOUT);
                return None;
            }
        };

        if !output.status.success() {
            debug!(command, status = %output.status, "--version exited unsuccessfully");
            return None;
        }

        first_line(&String::from_utf8_lossy(&output.stdout))
            .or_else(|| first_line(&String::from_utf8_lossy(&output.stderr)))
    }
}

/// Resolve `command` against a search path the way a shell would.
///
/// A command containing a path separator is checked as-is.
pub fn find_in_path(command: &str, path: &OsStr) -> Option<PathBuf> {
    let direct = Path::new(command);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    std::env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            candidate_names(command)
                .into_iter()
                .map(move |name| dir.join(name))
        })
        .find(|candidate| is_executable(candidate))
}

/// Resolve `command` against the process `PATH`, falling back to the bare name.
pub fn resolve_program(command: &str) -> PathBuf {
    std::env::var_os("PATH")
        .and_then(|path| find_in_path(command, &path))
        .unwrap_or_else(|| PathBuf::from(command))
}

#[cfg(windows)]
fn candidate_names(command: &str) -> Vec<String> {
    let mut names = vec![command.to_string()];
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    names.extend(
        exts.split(';')
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!("{}{}", command, ext.to_ascii_lowercase())),
    );
    names
}

#[cfg(not(windows))]
fn candidate_names(command: &str) -> Vec<String> {
    vec![command.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

// ============================================================================
// EnvironmentChecker
// ============================================================================

/// Checks prerequisites one at a time through a [`CommandProbe`].
pub struct EnvironmentChecker {
    probe: Arc<dyn CommandProbe>,
}

impl EnvironmentChecker {
    pub fn new(probe: Arc<dyn CommandProbe>) -> Self {
        Self { probe }
    }

    /// Presence and version of one prerequisite. Absent is a result, not an error.
    pub async fn check_runtime(&self, prerequisite: &Prerequisite) -> RuntimeStatus {
        if !self.probe.is_command_available(&prerequisite.command) {
            debug!("{} not found on search path", prerequisite.command);
            return RuntimeStatus::Absent;
        }

        let version = self
            .probe
            .version(&prerequisite.command)
            .await
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
        debug!(command = %prerequisite.command, %version, "Prerequisite present");
        RuntimeStatus::Present(version)
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock probe for tests. Records every query in `calls`.
#[cfg(test)]
pub struct MockProbe {
    pub commands_available: Vec<String>,
    pub versions: std::collections::HashMap<String, String>,
    pub calls: Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl MockProbe {
    pub fn with_commands(cmds: Vec<&str>) -> Self {
        Self {
            commands_available: cmds.iter().map(|s| s.to_string()).collect(),
            versions: std::collections::HashMap::new(),
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_version(mut self, command: &str, version: &str) -> Self {
        self.versions.insert(command.to_string(), version.to_string());
        self
    }

    pub fn with_call_log(mut self, calls: Arc<std::sync::Mutex<Vec<String>>>) -> Self {
        self.calls = calls;
        self
    }
}

#[cfg(test)]
#[async_trait]
impl CommandProbe for MockProbe {
    fn is_command_available(&self, command: &str) -> bool {
        self.calls.lock().unwrap().push(format!("detect:{}", command));
        self.commands_available.contains(&command.to_string())
    }

    async fn version(&self, command: &str) -> Option<String> {
        self.calls.lock().unwrap().push(format!("version:{}", command));
        self.versions.get(command).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_toolchain() {
        let toolchain = Toolchain::node();
        assert_eq!(toolchain.runtime.command, "node");
        assert_eq!(toolchain.runtime.role, PrerequisiteRole::Runtime);
        assert_eq!(toolchain.package_manager.command, "npm");
        assert_eq!(
            toolchain.package_manager.role,
            PrerequisiteRole::PackageManager
        );
        assert!(toolchain.runtime.required && toolchain.package_manager.required);
    }

    #[test]
    fn test_missing_error_by_role() {
        let toolchain = Toolchain::node();
        assert!(matches!(
            toolchain.runtime.missing_error(),
            PreflightError::MissingRuntime { .. }
        ));
        assert!(matches!(
            toolchain.package_manager.missing_error(),
            PreflightError::MissingPackageManager { .. }
        ));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  v20.11.1 \nextra"), Some("v20.11.1".to_string()));
        assert_eq!(first_line("   \n"), None);
    }

    #[tokio::test]
    async fn test_check_runtime_present_with_version() {
        let probe = MockProbe::with_commands(vec!["node"]).with_version("node", "v20.11.1");
        let checker = EnvironmentChecker::new(Arc::new(probe));
        let status = checker.check_runtime(&Toolchain::node().runtime).await;
        assert_eq!(status, RuntimeStatus::Present("v20.11.1".to_string()));
    }

    #[tokio::test]
    async fn test_check_runtime_present_unknown_version() {
        let checker = EnvironmentChecker::new(Arc::new(MockProbe::with_commands(vec!["npm"])));
        let status = checker
            .check_runtime(&Toolchain::node().package_manager)
            .await;
        assert_eq!(status, RuntimeStatus::Present(UNKNOWN_VERSION.to_string()));
    }

    #[tokio::test]
    async fn test_check_runtime_absent_skips_version_query() {
        let probe = MockProbe::with_commands(vec![]);
        let calls = probe.calls.clone();
        let checker = EnvironmentChecker::new(Arc::new(probe));
        let status = checker.check_runtime(&Toolchain::node().runtime).await;
        assert_eq!(status, RuntimeStatus::Absent);
        assert!(!status.is_present());
        assert_eq!(*calls.lock().unwrap(), vec!["detect:node".to_string()]);
    }

    #[test]
    fn test_find_in_path_missing_command() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in_path("nonexistent_command_xyz_123", dir.path().as_os_str()).is_none());
    }

    #[test]
    fn test_resolve_program_falls_back_to_name() {
        assert_eq!(
            resolve_program("nonexistent_command_xyz_123"),
            PathBuf::from("nonexistent_command_xyz_123")
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        #[test]
        fn test_find_in_path_executable() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "fake-node", "exit 0", 0o755);
            assert_eq!(
                find_in_path("fake-node", dir.path().as_os_str()),
                Some(script)
            );
        }

        #[test]
        fn test_find_in_path_ignores_non_executable() {
            let dir = tempfile::tempdir().unwrap();
            write_script(dir.path(), "fake-node", "exit 0", 0o644);
            assert!(find_in_path("fake-node", dir.path().as_os_str()).is_none());
        }

        #[test]
        fn test_find_in_path_respects_order() {
            let first = tempfile::tempdir().unwrap();
            let second = tempfile::tempdir().unwrap();
            let expected = write_script(first.path(), "tool", "exit 0", 0o755);
            write_script(second.path(), "tool", "exit 0", 0o755);
            let path =
                std::env::join_paths([first.path(), second.path()]).unwrap();
            assert_eq!(find_in_path("tool", &path), Some(expected));
        }

        #[tokio::test]
        async fn test_system_probe_reads_version() {
            let dir = tempfile::tempdir().unwrap();
            write_script(dir.path(), "fake-node", "echo v20.11.1", 0o755);
            let probe = SystemProbe::with_path(dir.path().as_os_str());
            assert!(probe.is_command_available("fake-node"));
            assert_eq!(probe.version("fake-node").await.as_deref(), Some("v20.11.1"));
        }

        #[tokio::test]
        async fn test_system_probe_failed_version_query() {
            let dir = tempfile::tempdir().unwrap();
            write_script(dir.path(), "fake-npm", "exit 3", 0o755);
            let probe = SystemProbe::with_path(dir.path().as_os_str());
            assert!(probe.version("fake-npm").await.is_none());
        }

        #[tokio::test]
        async fn test_system_probe_absent() {
            let dir = tempfile::tempdir().unwrap();
            let probe = SystemProbe::with_path(dir.path().as_os_str());
            assert!(!probe.is_command_available("fake-node"));
            assert!(probe.version("fake-node").await.is_none());
        }
    }
}
