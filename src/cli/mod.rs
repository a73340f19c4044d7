//! CLI module — argument parsing and the top-level run
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use preflight::config::{Config, LogFormat};
use preflight::orchestrator::{Orchestrator, EXIT_FAILURE};
use preflight::report::{MessageKind, Report};

#[derive(Parser, Debug)]
#[command(name = "preflight")]
#[command(version)]
#[command(
    about = "Check for Node.js and npm, install dependencies and smoke-test the service",
    long_about = None
)]
struct Cli {
    /// Project directory holding package.json (default: next to the binary, else the current directory)
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,
    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
    /// Diagnostic log format
    #[arg(long, value_enum, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Flags take precedence over environment overrides.
    fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.project_dir {
            config.project_dir = Some(dir.clone());
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

/// Entry point for the CLI — called from main().
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => exit_with_error(&e.to_string()),
    };
    cli.apply_to(&mut config);
    preflight::utils::logging::init_logging(&config.logging);

    let project_dir = match config
        .resolve_project_dir()
        .context("could not determine the project directory")
    {
        Ok(dir) => dir,
        Err(e) => exit_with_error(&format!("{:#}", e)),
    };

    let result = Orchestrator::from_config(&config, project_dir)
        .run(Report::stdout())
        .await;
    result.terminate()
}

/// Report a setup error before any run started and exit with failure.
fn exit_with_error(message: &str) -> ! {
    let mut report = Report::stdout();
    report.emit(MessageKind::Error, message);
    std::process::exit(EXIT_FAILURE)
}
