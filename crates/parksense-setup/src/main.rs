//! ParkSense bootstrap: entry point.
//!
//! Run once after unpacking the detector.  Checks the Python runtime,
//! optionally creates a virtual environment, installs the Python
//! dependencies and writes the default `config/settings.json` and
//! `data/parking_spaces.json`.
//!
//! # Usage
//!
//! ```text
//! parksense-setup [OPTIONS]
//!
//! Options:
//!   --base-dir <DIR>        Installation directory [default: .]
//!   --python <PATH>         Python interpreter [default: python3]
//!   --requirements <FILE>   Requirements file [default: <base>/requirements.txt]
//!   --yes                   Create the virtual environment without asking
//!   --no-venv               Never create a virtual environment
//!   --skip-install          Do not run pip
//! ```
//!
//! Exits `0` on success and `1` if the runtime check, the virtual
//! environment, the dependency install or any file operation fails.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parksense_core::InitOutcome;
use parksense_setup::application::bootstrap::{
    run_bootstrap, BootstrapOptions, BootstrapReport, DependencyStatus, GpuProbe, VenvChoice,
};
use parksense_setup::infrastructure::prompt::Prompt;
use parksense_setup::infrastructure::toolchain::system::SystemToolchain;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Prepare this machine to run the ParkSense occupancy detector.
#[derive(Debug, Parser)]
#[command(
    name = "parksense-setup",
    about = "Install dependencies and default configuration for the ParkSense detector",
    version
)]
struct Cli {
    /// Installation base directory.  `config/`, `data/` and `models/` are
    /// created inside it.
    #[arg(long, default_value = ".", env = "PARKSENSE_BASE_DIR")]
    base_dir: PathBuf,

    /// Python interpreter used to check the runtime and create the venv.
    #[arg(long, default_value = "python3", env = "PARKSENSE_PYTHON")]
    python: PathBuf,

    /// Requirements file passed to `pip install -r`.
    #[arg(long)]
    requirements: Option<PathBuf>,

    /// Create the virtual environment without asking.
    #[arg(long, conflicts_with = "no_venv")]
    yes: bool,

    /// Never create a virtual environment.
    #[arg(long)]
    no_venv: bool,

    /// Skip dependency installation.
    #[arg(long)]
    skip_install: bool,
}

impl Cli {
    fn into_options(self) -> BootstrapOptions {
        let mut options = BootstrapOptions::new(self.base_dir);
        options.python = self.python;
        if let Some(requirements) = self.requirements {
            options.requirements = requirements;
        }
        options.venv = match (self.yes, self.no_venv) {
            (true, _) => VenvChoice::Create,
            (_, true) => VenvChoice::Skip,
            _ => VenvChoice::Ask,
        };
        options.skip_install = self.skip_install;
        options
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Level is overridden by `RUST_LOG`.  Logs go to stderr so the summary
    // on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let options = Cli::parse().into_options();

    match run(&options) {
        Ok(report) => {
            print!("{}", render_summary(&options, &report));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            eprintln!("setup did not complete; fix the problem above and run parksense-setup again");
            ExitCode::from(1)
        }
    }
}

fn run(options: &BootstrapOptions) -> anyhow::Result<BootstrapReport> {
    info!(base = %options.layout.base_dir().display(), "starting ParkSense setup");

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    let toolchain = SystemToolchain::new();

    run_bootstrap(&toolchain, options, &mut prompt).with_context(|| {
        format!(
            "setup failed in {}",
            options.layout.base_dir().display()
        )
    })
}

fn render_summary(options: &BootstrapOptions, report: &BootstrapReport) -> String {
    let layout = &options.layout;
    let mut out = String::from("\nParkSense setup complete\n");

    out.push_str(&format!("  runtime:        {}\n", report.python_version));
    match &report.venv {
        Some(venv) => out.push_str(&format!("  venv:           {}\n", venv.display())),
        None => out.push_str("  venv:           not used\n"),
    }
    out.push_str(&format!(
        "  interpreter:    {}\n",
        report.interpreter.display()
    ));
    let deps = match &report.dependencies {
        DependencyStatus::Installed { requirements } => {
            format!("installed from {}", requirements.display())
        }
        DependencyStatus::Skipped => "skipped".to_string(),
        DependencyStatus::MissingRequirements { requirements } => {
            format!("not installed ({} not found)", requirements.display())
        }
    };
    out.push_str(&format!("  dependencies:   {deps}\n"));
    out.push_str(&format!(
        "  settings:       {} ({})\n",
        layout.settings_path().display(),
        describe(report.settings)
    ));
    out.push_str(&format!(
        "  parking spaces: {} ({})\n",
        layout.parking_spaces_path().display(),
        describe(report.parking_spaces)
    ));

    match &report.gpu {
        GpuProbe::Detected(gpus) => {
            for gpu in gpus {
                out.push_str(&format!(
                    "  gpu:            {} (driver {}, {})\n",
                    gpu.name, gpu.driver_version, gpu.memory_total
                ));
            }
        }
        GpuProbe::NotDetected { reason } => {
            out.push_str(&format!("  gpu:            none ({reason})\n"));
        }
    }
    out.push_str(&format!("  device:         {}\n", report.effective_device));
    for issue in &report.issues {
        out.push_str(&format!("  warning:        {issue}\n"));
    }

    if !layout.model_path().is_file() {
        out.push_str(&format!(
            "\nThe model weights are downloaded to {} on the detector's first start.\n",
            layout.model_path().display()
        ));
    }
    out.push_str("\nSwitch the compute device at any time with:\n");
    out.push_str("  parksense-mode cpu | cuda | auto\n");
    out
}

fn describe(outcome: InitOutcome) -> &'static str {
    match outcome {
        InitOutcome::Created => "created with defaults",
        InitOutcome::AlreadyPresent => "kept existing",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parksense_core::domain::device::{ComputeDevice, DeviceReason, EffectiveDevice};

    fn sample_report() -> BootstrapReport {
        BootstrapReport {
            python_version: "Python 3.11.4".to_string(),
            interpreter: PathBuf::from("python3"),
            venv: None,
            dependencies: DependencyStatus::Skipped,
            settings: InitOutcome::Created,
            parking_spaces: InitOutcome::AlreadyPresent,
            gpu: GpuProbe::NotDetected {
                reason: "'nvidia-smi' was not found".to_string(),
            },
            effective_device: EffectiveDevice {
                device: ComputeDevice::Cpu,
                reason: DeviceReason::AutoDetected,
            },
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let options = Cli::parse_from(["parksense-setup"]).into_options();

        // Assert
        assert_eq!(options.python, PathBuf::from("python3"));
        assert_eq!(options.venv, VenvChoice::Ask);
        assert!(!options.skip_install);
    }

    #[test]
    fn test_cli_yes_creates_venv_without_prompt() {
        let options = Cli::parse_from(["parksense-setup", "--yes"]).into_options();
        assert_eq!(options.venv, VenvChoice::Create);
    }

    #[test]
    fn test_cli_no_venv_skips_venv() {
        let options = Cli::parse_from(["parksense-setup", "--no-venv"]).into_options();
        assert_eq!(options.venv, VenvChoice::Skip);
    }

    #[test]
    fn test_cli_yes_and_no_venv_conflict() {
        let result = Cli::try_parse_from(["parksense-setup", "--yes", "--no-venv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requirements_override() {
        let options = Cli::parse_from([
            "parksense-setup",
            "--base-dir",
            "/opt/parksense",
            "--requirements",
            "/tmp/req.txt",
        ])
        .into_options();
        assert_eq!(options.requirements, PathBuf::from("/tmp/req.txt"));
        assert_eq!(
            options.layout.settings_path(),
            PathBuf::from("/opt/parksense/config/settings.json")
        );
    }

    #[test]
    fn test_summary_reports_documents_and_device() {
        let options = BootstrapOptions::new("/opt/parksense");

        let summary = render_summary(&options, &sample_report());

        assert!(summary.contains("settings.json (created with defaults)"));
        assert!(summary.contains("parking_spaces.json (kept existing)"));
        assert!(summary.contains("device:         CPU (auto-detected)"));
        assert!(summary.contains("parksense-mode cpu | cuda | auto"));
    }

    #[test]
    fn test_summary_shows_interpreter_to_start_detector_with() {
        let options = BootstrapOptions::new("/opt/parksense");
        let report = BootstrapReport {
            venv: Some(PathBuf::from("/opt/parksense/venv")),
            interpreter: PathBuf::from("/opt/parksense/venv/bin/python"),
            ..sample_report()
        };

        let summary = render_summary(&options, &report);

        assert!(summary.contains("  interpreter:    /opt/parksense/venv/bin/python\n"));
    }
}
