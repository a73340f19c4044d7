//! Shared fixtures for the binary-level tests.
//!
//! A `Workspace` holds a throwaway project directory and a private `bin/`
//! directory that stands in for the operator's PATH. Fake `node` and `npm`
//! executables are small shell scripts, so every scenario runs without a
//! real Node.js installation.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const NODE_VERSION: &str = "v20.11.1";
pub const NPM_VERSION: &str = "10.2.4";

pub struct Workspace {
    root: tempfile::TempDir,
}

pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// Stdout lines with terminal styling removed.
    pub fn lines(&self) -> Vec<String> {
        console::strip_ansi_codes(&self.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn plain(&self) -> String {
        console::strip_ansi_codes(&self.stdout).to_string()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("bin")).unwrap();
        fs::create_dir(root.path().join("project")).unwrap();
        Self { root }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.path().join("project")
    }

    /// Path outside the project where fake tools record their invocations.
    pub fn marker(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    pub fn write_project_file(&self, name: &str, content: &str) {
        fs::write(self.project_dir().join(name), content).unwrap();
    }

    /// A project with a `main` entry script and a start script.
    pub fn with_service_project(self) -> Self {
        self.write_project_file(
            "package.json",
            r#"{"name":"toolkit-server","version":"1.0.0","main":"server.js","scripts":{"start":"node server.js"}}"#,
        );
        self.write_project_file("server.js", "// service\n");
        self
    }

    /// Fake `node`: answers `--version`, otherwise runs `behaviour`.
    pub fn with_node(self, behaviour: &str) -> Self {
        let body = format!(
            "if [ \"$1\" = \"--version\" ]; then echo {}; exit 0; fi\n{}\n",
            NODE_VERSION, behaviour
        );
        write_script(&self.bin_dir().join("node"), &body);
        self
    }

    /// Fake `npm`: answers `--version`, otherwise runs `behaviour`.
    pub fn with_npm(self, behaviour: &str) -> Self {
        let body = format!(
            "if [ \"$1\" = \"--version\" ]; then echo {}; exit 0; fi\n{}\n",
            NPM_VERSION, behaviour
        );
        write_script(&self.bin_dir().join("npm"), &body);
        self
    }

    /// Run the binary against this workspace with `envs` on top of a clean config.
    pub fn run(&self, envs: &[(&str, &str)]) -> RunOutput {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_preflight"));
        cmd.arg("--project-dir")
            .arg(self.project_dir())
            .env("PATH", self.bin_dir())
            .env_remove("RUST_LOG")
            .env_remove("PREFLIGHT_PROJECT_DIR")
            .env_remove("PREFLIGHT_SMOKE_TIMEOUT_MS")
            .env_remove("PREFLIGHT_LOG_LEVEL")
            .env_remove("PREFLIGHT_LOG_FORMAT");
        for (key, value) in envs {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("failed to execute preflight binary");
        RunOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
}
