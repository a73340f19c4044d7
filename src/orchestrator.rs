//! Orchestrator — sequences the checks, the install and the smoke test.
//!
//! The run is a linear state machine:
//!
//! ```text
//! Init → CheckingRuntime → CheckingPackageManager → Installing → SmokeTesting → Done
//!              └───────────────────┴───────────────────┴──→ Failed
//! ```
//!
//! Each stage gates the next. A missing runtime, a missing package manager
//! or a failed install ends the run in `Failed` with exit code 1. Every smoke
//! test outcome leads to `Done` with exit code 0; a timeout is reported as
//! expected and a failure only as a warning. `Orchestrator::run` consumes the
//! orchestrator, so no stage is ever revisited.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::checker::{
    CommandProbe, EnvironmentChecker, Prerequisite, PrerequisiteRole, RuntimeStatus, SystemProbe,
    Toolchain,
};
use crate::config::{Config, DEFAULT_MANIFEST_FILE, DEFAULT_SMOKE_TIMEOUT_MS};
use crate::error::PreflightError;
use crate::installer::{DependencyInstaller, PackageManagerInstaller};
use crate::manifest::Manifest;
use crate::report::{MessageKind, Report};
use crate::smoke::{EntryPoint, ProcessProbe, ServiceProbe, SmokeTestOutcome};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// States of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    CheckingRuntime,
    CheckingPackageManager,
    Installing,
    SmokeTesting,
    Done,
    Failed,
}

impl Stage {
    /// The stage that checks a prerequisite with `role`.
    pub fn checking(role: PrerequisiteRole) -> Self {
        match role {
            PrerequisiteRole::Runtime => Stage::CheckingRuntime,
            PrerequisiteRole::PackageManager => Stage::CheckingPackageManager,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// Terminal aggregate of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    /// The rendered report, as written to the operator.
    pub message: String,
    /// Stages in the order they were entered, `Init` first.
    pub stages: Vec<Stage>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }

    /// End the process with this run's exit status.
    pub fn terminate(self) -> ! {
        std::process::exit(self.exit_code)
    }
}

/// Drives one run over the component traits.
pub struct Orchestrator {
    project_dir: PathBuf,
    toolchain: Toolchain,
    checker: EnvironmentChecker,
    installer: Arc<dyn DependencyInstaller>,
    service_probe: Arc<dyn ServiceProbe>,
    manifest_file: String,
    smoke_timeout_ms: u64,
    stages: Vec<Stage>,
}

impl Orchestrator {
    pub fn new(
        project_dir: PathBuf,
        toolchain: Toolchain,
        command_probe: Arc<dyn CommandProbe>,
        installer: Arc<dyn DependencyInstaller>,
        service_probe: Arc<dyn ServiceProbe>,
    ) -> Self {
        Self {
            project_dir,
            toolchain,
            checker: EnvironmentChecker::new(command_probe),
            installer,
            service_probe,
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            smoke_timeout_ms: DEFAULT_SMOKE_TIMEOUT_MS,
            stages: vec![Stage::Init],
        }
    }

    /// Orchestrator wired to the host: PATH lookup, `npm install`, a real probe process.
    pub fn from_config(config: &Config, project_dir: PathBuf) -> Self {
        Self::new(
            project_dir,
            Toolchain::node(),
            Arc::new(SystemProbe::new()),
            Arc::new(PackageManagerInstaller::npm().with_manifest_file(&config.manifest_file)),
            Arc::new(ProcessProbe),
        )
        .with_manifest_file(&config.manifest_file)
        .with_smoke_timeout_ms(config.smoke_timeout_ms)
    }

    pub fn with_smoke_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.smoke_timeout_ms = timeout_ms;
        self
    }

    pub fn with_manifest_file(mut self, manifest_file: &str) -> Self {
        self.manifest_file = manifest_file.to_string();
        self
    }

    /// Execute the run once, writing status lines to `report`.
    pub async fn run(mut self, mut report: Report) -> RunResult {
        info!(project_dir = %self.project_dir.display(), "Starting preflight run");

        // Checks run in toolchain order; the first missing required one ends the run.
        let toolchain = self.toolchain.clone();
        for prerequisite in toolchain.prerequisites() {
            self.enter(Stage::checking(prerequisite.role));
            if let Err(e) = self.check(prerequisite, &mut report).await {
                return self.fail(e, report);
            }
        }
        let runtime = &toolchain.runtime;
        let package_manager = &toolchain.package_manager;

        self.enter(Stage::Installing);
        report.emit(
            MessageKind::Info,
            format!("Installing dependencies with `{}`...", self.installer.command_line()),
        );
        let install = self.installer.install(&self.project_dir).await;
        if !install.succeeded {
            let e = PreflightError::InstallFailure {
                command: self.installer.command_line(),
                diagnostic: install.diagnostic_output,
            };
            return self.fail(e, report);
        }
        report.emit(MessageKind::Success, "Dependencies installed");

        self.enter(Stage::SmokeTesting);
        let manifest = self.load_manifest();
        let entry = EntryPoint::for_manifest(&runtime.command, &self.project_dir, &manifest);
        report.emit(
            MessageKind::Info,
            format!(
                "Running smoke test `{}` ({}s limit)...",
                entry.command_line(),
                self.smoke_timeout_ms as f64 / 1000.0
            ),
        );
        let outcome = self
            .service_probe
            .probe(&entry, Duration::from_millis(self.smoke_timeout_ms))
            .await;
        match self.smoke_test_error(outcome) {
            None => {
                info!("Smoke test passed");
                report.emit(MessageKind::Success, "Smoke test passed");
            }
            Some(e) if e.is_fatal() => return self.fail(e, report),
            Some(e) => caution(&e, &mut report),
        }

        self.enter(Stage::Done);
        report.blank();
        let subject = manifest
            .label()
            .unwrap_or_else(|| self.project_dir.display().to_string());
        report.emit(
            MessageKind::Success,
            format!("Setup complete: {} is ready", subject),
        );
        report.emit(MessageKind::Heading, "Next steps");
        report.steps(&next_steps(&manifest, &entry, package_manager));

        RunResult {
            exit_code: EXIT_SUCCESS,
            message: report.into_transcript(),
            stages: self.stages,
        }
    }

    async fn check(
        &self,
        prerequisite: &Prerequisite,
        report: &mut Report,
    ) -> Result<(), PreflightError> {
        match self.checker.check_runtime(prerequisite).await {
            RuntimeStatus::Present(version) => {
                report.emit(
                    MessageKind::Success,
                    format!("{} found ({})", prerequisite.display_name, version),
                );
                Ok(())
            }
            RuntimeStatus::Absent if !prerequisite.required => {
                report.emit(
                    MessageKind::Warning,
                    format!("{} not found (optional)", prerequisite.display_name),
                );
                Ok(())
            }
            RuntimeStatus::Absent => Err(prerequisite.missing_error()),
        }
    }

    fn smoke_test_error(&self, outcome: SmokeTestOutcome) -> Option<PreflightError> {
        match outcome {
            SmokeTestOutcome::Passed => None,
            SmokeTestOutcome::TimedOut => {
                info!("Smoke test timed out (expected)");
                Some(PreflightError::SmokeTestTimeout {
                    timeout_ms: self.smoke_timeout_ms,
                })
            }
            SmokeTestOutcome::Failed(reason) => {
                warn!("Smoke test failed: {}", reason);
                Some(PreflightError::SmokeTestFailure { reason })
            }
        }
    }

    fn load_manifest(&self) -> Manifest {
        let path = self.project_dir.join(&self.manifest_file);
        Manifest::load(&path).unwrap_or_else(|e| {
            warn!("Could not read {}: {}; assuming defaults", path.display(), e);
            Manifest::default()
        })
    }

    fn enter(&mut self, next: Stage) {
        let current = self.stage();
        debug_assert!(!current.is_terminal(), "run already finished in {:?}", current);
        debug!(from = ?current, to = ?next, "Stage transition");
        self.stages.push(next);
    }

    fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Init)
    }

    fn fail(mut self, e: PreflightError, mut report: Report) -> RunResult {
        error!(stage = ?self.stage(), "Run failed: {}", e);
        self.enter(Stage::Failed);

        match &e {
            PreflightError::InstallFailure { diagnostic, .. } => {
                report.emit(MessageKind::Error, "Dependency installation failed");
                report.detail(diagnostic);
            }
            _ => report.emit(MessageKind::Error, e.to_string()),
        }
        if let Some(hint) = e.hint() {
            report.hint(hint);
        }

        RunResult {
            exit_code: EXIT_FAILURE,
            message: report.into_transcript(),
            stages: self.stages,
        }
    }
}

/// Report a soft error as a warning with its hint.
fn caution(e: &PreflightError, report: &mut Report) {
    report.emit(MessageKind::Warning, e.to_string());
    if let Some(hint) = e.hint() {
        report.hint(hint);
    }
}

fn next_steps(manifest: &Manifest, entry: &EntryPoint, package_manager: &Prerequisite) -> Vec<String> {
    let start = if manifest.has_script("start") {
        format!("Start the service: {} start", package_manager.command)
    } else {
        format!(
            "Start the service: {} {}",
            entry.program,
            entry.script.display()
        )
    };
    vec![
        start,
        format!("Re-run the self-test at any time: {}", entry.command_line()),
        "Load the shell helper library into your session to use the toolkit commands".to_string(),
    ]
}
