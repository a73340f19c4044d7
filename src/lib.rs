//! Preflight - verify the Node.js toolchain, install dependencies and smoke-test the service

pub mod checker;
pub mod config;
pub mod error;
pub mod installer;
pub mod manifest;
pub mod orchestrator;
pub mod report;
pub mod smoke;
pub mod utils;

pub use checker::{CommandProbe, EnvironmentChecker, Prerequisite, RuntimeStatus, Toolchain};
pub use config::Config;
pub use error::{PreflightError, Result};
pub use installer::{DependencyInstaller, InstallOutcome, PackageManagerInstaller};
pub use manifest::Manifest;
pub use orchestrator::{Orchestrator, RunResult, Stage};
pub use report::{MessageKind, Report};
pub use smoke::{EntryPoint, ProcessProbe, ServiceProbe, SmokeTestOutcome};
