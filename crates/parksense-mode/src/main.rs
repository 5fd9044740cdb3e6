//! ParkSense device-mode switcher: entry point.
//!
//! Rewrites the `device` / `force_cpu` pair in the detector's settings file
//! without hand-editing JSON.  The previous file is copied to
//! `settings.json.backup` first.
//!
//! # Usage
//!
//! ```text
//! parksense-mode [OPTIONS] <MODE>
//!
//! Arguments:
//!   <MODE>  cpu | cuda | auto
//!
//! Options:
//!   --base-dir <DIR>    Installation directory [default: .]
//!   --settings <FILE>   Settings file, overrides --base-dir
//! ```
//!
//! | Mode   | device   | force_cpu |
//! |--------|----------|-----------|
//! | `cpu`  | `"cpu"`  | `true`    |
//! | `cuda` | `"cuda"` | `false`   |
//! | `auto` | `"auto"` | `false`   |
//!
//! # Exit codes
//!
//! `0` on success.  `1` when the mode is missing or unknown, the settings
//! file does not exist, or any read/write fails.
//!
//! The running detector is not signalled.  It picks up the new mode the next
//! time it starts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use parksense_core::{switch_mode, ConfigError, DeviceMode, ModeSwitchOutcome, ProjectLayout};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Switch the ParkSense detector between CPU, CUDA and automatic device
/// selection.
#[derive(Debug, Parser)]
#[command(
    name = "parksense-mode",
    about = "Switch the ParkSense detector compute device (cpu, cuda, auto)",
    version
)]
struct Cli {
    /// Device mode to apply: cpu, cuda or auto.
    ///
    /// Kept as a plain string so an unknown value is reported by the switch
    /// itself, before any file is opened.
    mode: String,

    /// Installation base directory containing `config/settings.json`.
    #[arg(long, default_value = ".", env = "PARKSENSE_BASE_DIR")]
    base_dir: PathBuf,

    /// Path of the settings file.  Takes precedence over `--base-dir`.
    #[arg(long, env = "PARKSENSE_SETTINGS")]
    settings: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(|| ProjectLayout::new(&self.base_dir).settings_path())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Default to `warn` so the report on stdout is not interleaved with
    // routine log lines.  `RUST_LOG=info` shows the transaction steps.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = parse_exit_code(&err);
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    match run(&cli) {
        Ok(outcome) => {
            print!("{}", render_report(&outcome));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(hint) = hint_for(&err) {
                eprintln!("{hint}");
            }
            ExitCode::from(1)
        }
    }
}

/// Help and version requests exit 0; every other parse failure (including a
/// missing mode argument) exits 1.
fn parse_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn run(cli: &Cli) -> anyhow::Result<ModeSwitchOutcome> {
    let path = cli.settings_path();
    debug!(path = %path.display(), mode = %cli.mode, "switching device mode");

    switch_mode(&path, &cli.mode)
        .with_context(|| format!("could not switch device mode in {}", path.display()))
}

fn render_report(outcome: &ModeSwitchOutcome) -> String {
    let mut out = format!(
        "Device mode switched: {} -> {}\n  device:    {}\n  force_cpu: {}\n  backup:    {}\n",
        outcome.previous,
        outcome.device,
        outcome.device,
        outcome.force_cpu,
        outcome.backup_path.display()
    );
    for issue in &outcome.issues {
        out.push_str(&format!("  warning:   {issue}\n"));
    }
    if outcome.device == DeviceMode::Cuda {
        out.push_str("CUDA falls back to the CPU if no usable GPU is found at startup.\n");
    }
    out.push_str("Restart the detector for the change to take effect.\n");
    out
}

fn hint_for(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<ConfigError>()? {
        ConfigError::InvalidMode(_) => Some(format!(
            "usage: parksense-mode <{}>",
            DeviceMode::ALL.map(DeviceMode::as_str).join("|")
        )),
        ConfigError::NotFound { .. } => {
            Some("run parksense-setup first to create the default settings".to_string())
        }
        ConfigError::Parse { path, .. } => Some(format!(
            "the live file was not modified; a copy was saved to {}",
            parksense_core::backup_path(path).display()
        )),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn cli_for(settings: PathBuf, mode: &str) -> Cli {
        Cli {
            mode: mode.to_string(),
            base_dir: PathBuf::from("."),
            settings: Some(settings),
        }
    }

    fn sandbox() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parksense_mode_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_cli_requires_mode_argument() {
        // Arrange / Act
        let err = Cli::try_parse_from(["parksense-mode"]).unwrap_err();

        // Assert: a missing argument maps to exit code 1, not clap's usual 2
        assert_eq!(parse_exit_code(&err), 1);
    }

    #[test]
    fn test_cli_help_exits_zero() {
        let err = Cli::try_parse_from(["parksense-mode", "--help"]).unwrap_err();
        assert_eq!(parse_exit_code(&err), 0);
    }

    #[test]
    fn test_cli_accepts_any_mode_string() {
        // Validation happens in switch_mode, not in clap.
        let cli = Cli::try_parse_from(["parksense-mode", "gpu"]).expect("parse");
        assert_eq!(cli.mode, "gpu");
    }

    #[test]
    fn test_cli_rejects_extra_positional() {
        let result = Cli::try_parse_from(["parksense-mode", "cpu", "cuda"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_path_defaults_to_base_dir_layout() {
        let cli = Cli {
            mode: "cpu".to_string(),
            base_dir: PathBuf::from("/opt/parksense"),
            settings: None,
        };
        assert_eq!(
            cli.settings_path(),
            PathBuf::from("/opt/parksense/config/settings.json")
        );
    }

    #[test]
    fn test_settings_flag_overrides_base_dir() {
        let cli = Cli::try_parse_from([
            "parksense-mode",
            "--base-dir",
            "/opt/parksense",
            "--settings",
            "/tmp/custom.json",
            "auto",
        ])
        .expect("parse");
        assert_eq!(cli.settings_path(), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn test_run_switches_existing_file() {
        // Arrange
        let dir = sandbox();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"occupancy_threshold": 0.6}"#).unwrap();

        // Act
        let outcome = run(&cli_for(path.clone(), "cuda")).expect("run");

        // Assert
        assert_eq!(outcome.device, DeviceMode::Cuda);
        assert!(!outcome.force_cpu);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_missing_file_gives_setup_hint() {
        let dir = sandbox();
        let err = run(&cli_for(dir.join("settings.json"), "cpu")).unwrap_err();

        let hint = hint_for(&err).expect("hint");

        assert!(hint.contains("parksense-setup"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_invalid_mode_gives_usage_hint() {
        let dir = sandbox();
        let err = run(&cli_for(dir.join("settings.json"), "gpu")).unwrap_err();

        assert_eq!(
            hint_for(&err).as_deref(),
            Some("usage: parksense-mode <cpu|cuda|auto>")
        );
        assert!(format!("{err:#}").contains("unknown device mode 'gpu'"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_report_lists_resulting_pair() {
        let outcome = ModeSwitchOutcome {
            previous: DeviceMode::Auto,
            device: DeviceMode::Cpu,
            force_cpu: true,
            backup_path: PathBuf::from("config/settings.json.backup"),
            issues: Vec::new(),
        };

        let report = render_report(&outcome);

        assert!(report.starts_with("Device mode switched: auto -> cpu\n"));
        assert!(report.contains("  force_cpu: true\n"));
        assert!(report.contains("config/settings.json.backup"));
        assert!(!report.contains("CUDA falls back"));
    }
}
