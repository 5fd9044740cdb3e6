//! BootstrapUseCase: prepares a machine to run the detector.
//!
//! # Steps
//!
//! ```text
//! 1. python --version                 fatal on failure
//! 2. virtual environment (y/n)        fatal if creation fails
//! 3. pip install -r requirements.txt  fatal on failure, skipped if no file
//! 4. mkdir config/ data/ models/
//! 5. settings.json, parking_spaces.json (create if absent)
//! 6. nvidia-smi                       never fatal
//! ```
//!
//! Steps 1 to 3 run before any detector file (`config/`, `data/`,
//! `models/` and the two documents) is created, so a broken toolchain
//! leaves no half-prepared installation behind.  Only step 2 writes under
//! the base directory, and only the `venv/` it was asked to create.  Step 5
//! reads the settings back before creating the parking spaces document, so
//! an unreadable settings file stops the run before that file exists.  It
//! only ever writes the documented defaults, and only when a file is
//! missing.  A re-run on a prepared machine changes nothing on disk.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use parksense_core::domain::device::EffectiveDevice;
use parksense_core::infrastructure::storage::{config_store, parking_spaces};
use parksense_core::{ConfigError, InitOutcome, ProjectLayout, SettingsIssue};
use thiserror::Error;
use tracing::{info, warn};

use crate::infrastructure::prompt::Prompt;
use crate::infrastructure::toolchain::{venv_interpreter, GpuInfo, Toolchain, ToolchainError};

pub const VENV_DIR_NAME: &str = "venv";
pub const REQUIREMENTS_FILE_NAME: &str = "requirements.txt";

/// Whether to set up a virtual environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenvChoice {
    /// Ask the operator.
    Ask,
    Create,
    Skip,
}

/// Inputs to [`run_bootstrap`].
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub layout: ProjectLayout,
    /// System interpreter used for the version check and to create the venv.
    pub python: PathBuf,
    pub venv: VenvChoice,
    pub requirements: PathBuf,
    pub skip_install: bool,
}

impl BootstrapOptions {
    /// Defaults for an installation rooted at `base`: `python3`, ask about
    /// the venv, install from `<base>/requirements.txt`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let layout = ProjectLayout::new(base);
        let requirements = layout.base_dir().join(REQUIREMENTS_FILE_NAME);
        Self {
            layout,
            python: PathBuf::from("python3"),
            venv: VenvChoice::Ask,
            requirements,
            skip_install: false,
        }
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.layout.base_dir().join(VENV_DIR_NAME)
    }
}

/// Outcome of the dependency step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Installed { requirements: PathBuf },
    /// `--skip-install` was given.
    Skipped,
    /// There was no requirements file to install from.
    MissingRequirements { requirements: PathBuf },
}

/// Outcome of the GPU probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuProbe {
    Detected(Vec<GpuInfo>),
    /// The driver tool is missing, failed, or listed no GPUs.
    NotDetected { reason: String },
}

impl GpuProbe {
    pub fn cuda_available(&self) -> bool {
        matches!(self, GpuProbe::Detected(gpus) if !gpus.is_empty())
    }
}

/// Everything the bootstrap did, for the console summary.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub python_version: String,
    /// Interpreter the detector should be started with.
    pub interpreter: PathBuf,
    pub venv: Option<PathBuf>,
    pub dependencies: DependencyStatus,
    pub settings: InitOutcome,
    pub parking_spaces: InitOutcome,
    pub gpu: GpuProbe,
    pub effective_device: EffectiveDevice,
    pub issues: Vec<SettingsIssue>,
}

/// Error type for the bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Python runtime check failed: {0}")]
    Runtime(#[source] ToolchainError),

    #[error("could not create virtual environment at {}: {source}", .path.display())]
    Venv {
        path: PathBuf,
        #[source]
        source: ToolchainError,
    },

    #[error("dependency installation failed: {0}")]
    Dependencies(#[source] ToolchainError),

    #[error("could not create directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read the operator's answer: {0}")]
    Prompt(#[source] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs every bootstrap step in order.
///
/// # Errors
///
/// Stops at the first fatal step; see the module docs for which steps are
/// fatal.  The GPU probe never fails the bootstrap.
pub fn run_bootstrap<T, R, W>(
    toolchain: &T,
    options: &BootstrapOptions,
    prompt: &mut Prompt<R, W>,
) -> Result<BootstrapReport, BootstrapError>
where
    T: Toolchain + ?Sized,
    R: BufRead,
    W: Write,
{
    // ── 1. Runtime ────────────────────────────────────────────────────────────
    let python_version = toolchain
        .python_version(&options.python)
        .map_err(BootstrapError::Runtime)?;
    info!(interpreter = %options.python.display(), version = %python_version, "python found");

    // ── 2. Virtual environment ────────────────────────────────────────────────
    let venv = prepare_venv(toolchain, options, prompt)?;
    let interpreter = venv
        .as_deref()
        .map(venv_interpreter)
        .unwrap_or_else(|| options.python.clone());

    // ── 3. Dependencies ───────────────────────────────────────────────────────
    let dependencies = if options.skip_install {
        info!("dependency installation skipped");
        DependencyStatus::Skipped
    } else if !options.requirements.is_file() {
        warn!(
            requirements = %options.requirements.display(),
            "requirements file not found, skipping dependency installation"
        );
        DependencyStatus::MissingRequirements {
            requirements: options.requirements.clone(),
        }
    } else {
        toolchain
            .install_requirements(&interpreter, &options.requirements)
            .map_err(BootstrapError::Dependencies)?;
        info!(requirements = %options.requirements.display(), "dependencies installed");
        DependencyStatus::Installed {
            requirements: options.requirements.clone(),
        }
    };

    // ── 4. Directories ────────────────────────────────────────────────────────
    for dir in options.layout.directories() {
        fs::create_dir_all(&dir).map_err(|source| BootstrapError::Directory {
            path: dir.clone(),
            source,
        })?;
    }

    // ── 5. Documents ──────────────────────────────────────────────────────────
    let settings_path = options.layout.settings_path();
    let settings = config_store::ensure_initialized(&settings_path)?;
    let document = config_store::load(&settings_path)?;
    let issues = document.issues();
    for issue in &issues {
        warn!(path = %settings_path.display(), "settings issue: {issue}");
    }

    let parking_spaces = parking_spaces::ensure_initialized(&options.layout.parking_spaces_path())?;

    // ── 6. GPU probe ──────────────────────────────────────────────────────────
    let gpu = probe_gpu(toolchain);
    let effective_device = document.settings().effective_device(gpu.cuda_available());
    info!(device = %effective_device, "detector device with current settings");

    Ok(BootstrapReport {
        python_version,
        interpreter,
        venv,
        dependencies,
        settings,
        parking_spaces,
        gpu,
        effective_device,
        issues,
    })
}

/// Returns the venv directory if one is (or already was) set up.
fn prepare_venv<T, R, W>(
    toolchain: &T,
    options: &BootstrapOptions,
    prompt: &mut Prompt<R, W>,
) -> Result<Option<PathBuf>, BootstrapError>
where
    T: Toolchain + ?Sized,
    R: BufRead,
    W: Write,
{
    let venv_dir = options.venv_dir();
    let wanted = match options.venv {
        VenvChoice::Create => true,
        VenvChoice::Skip => false,
        VenvChoice::Ask => prompt
            .confirm(&format!(
                "Create an isolated virtual environment in {}?",
                venv_dir.display()
            ))
            .map_err(BootstrapError::Prompt)?,
    };

    if !wanted {
        return Ok(None);
    }

    if venv_interpreter(&venv_dir).is_file() {
        info!(venv = %venv_dir.display(), "reusing existing virtual environment");
        return Ok(Some(venv_dir));
    }

    toolchain
        .create_venv(&options.python, &venv_dir)
        .map_err(|source| BootstrapError::Venv {
            path: venv_dir.clone(),
            source,
        })?;
    info!(venv = %venv_dir.display(), "virtual environment created");
    Ok(Some(venv_dir))
}

fn probe_gpu<T: Toolchain + ?Sized>(toolchain: &T) -> GpuProbe {
    match toolchain.query_gpus() {
        Ok(gpus) if !gpus.is_empty() => {
            for gpu in &gpus {
                info!(name = %gpu.name, driver = %gpu.driver_version, memory = %gpu.memory_total, "GPU detected");
            }
            GpuProbe::Detected(gpus)
        }
        Ok(_) => GpuProbe::NotDetected {
            reason: "the driver reported no GPUs".to_string(),
        },
        Err(e) => {
            info!("no NVIDIA GPU detected: {e}");
            GpuProbe::NotDetected {
                reason: e.to_string(),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::toolchain::mock::{MockToolchain, ToolchainCall};
    use parksense_core::ComputeDevice;
    use std::io::Cursor;

    fn sandbox() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parksense_boot_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn silent_prompt() -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(Vec::new()), Vec::new())
    }

    #[test]
    fn test_options_defaults() {
        let options = BootstrapOptions::new("/opt/parksense");
        assert_eq!(options.python, PathBuf::from("python3"));
        assert_eq!(options.venv, VenvChoice::Ask);
        assert_eq!(
            options.requirements,
            PathBuf::from("/opt/parksense/requirements.txt")
        );
        assert_eq!(options.venv_dir(), PathBuf::from("/opt/parksense/venv"));
    }

    #[test]
    fn test_gpu_probe_cuda_available_only_with_gpus() {
        assert!(!GpuProbe::Detected(Vec::new()).cuda_available());
        assert!(!GpuProbe::NotDetected {
            reason: "missing".to_string()
        }
        .cuda_available());
    }

    #[test]
    fn test_declined_venv_uses_system_python() {
        // Arrange
        let base = sandbox();
        let mut options = BootstrapOptions::new(&base);
        options.skip_install = true;
        let mock = MockToolchain::new();
        let mut prompt = Prompt::new(Cursor::new(b"n\n".to_vec()), Vec::new());

        // Act
        let report = run_bootstrap(&mock, &options, &mut prompt).expect("bootstrap");

        // Assert
        assert_eq!(report.venv, None);
        assert_eq!(report.interpreter, PathBuf::from("python3"));
        assert!(!mock
            .calls()
            .iter()
            .any(|c| matches!(c, ToolchainCall::CreateVenv { .. })));

        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn test_accepted_venv_installs_into_venv() {
        let base = sandbox();
        fs::write(base.join(REQUIREMENTS_FILE_NAME), "ultralytics\n").unwrap();
        let options = BootstrapOptions::new(&base);
        let mock = MockToolchain::new();
        let mut prompt = Prompt::new(Cursor::new(b"y\n".to_vec()), Vec::new());

        let report = run_bootstrap(&mock, &options, &mut prompt).expect("bootstrap");

        let venv_dir = base.join(VENV_DIR_NAME);
        assert_eq!(report.venv.as_deref(), Some(venv_dir.as_path()));
        assert!(mock.calls().contains(&ToolchainCall::InstallRequirements {
            interpreter: venv_interpreter(&venv_dir),
            requirements: base.join(REQUIREMENTS_FILE_NAME),
        }));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn test_gpu_probe_failure_is_not_fatal() {
        let base = sandbox();
        let mut options = BootstrapOptions::new(&base);
        options.venv = VenvChoice::Skip;
        let mock = MockToolchain::new();

        let report = run_bootstrap(&mock, &options, &mut silent_prompt()).expect("bootstrap");

        assert!(matches!(report.gpu, GpuProbe::NotDetected { .. }));
        assert_eq!(report.effective_device.device, ComputeDevice::Cpu);
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn test_detected_gpu_makes_auto_resolve_to_cuda() {
        let base = sandbox();
        let mut options = BootstrapOptions::new(&base);
        options.venv = VenvChoice::Skip;
        let mock = MockToolchain::new().with_gpus(vec![GpuInfo {
            name: "NVIDIA GeForce RTX 3060".to_string(),
            driver_version: "535.54.03".to_string(),
            memory_total: "12288 MiB".to_string(),
        }]);

        let report = run_bootstrap(&mock, &options, &mut silent_prompt()).expect("bootstrap");

        assert!(report.gpu.cuda_available());
        assert_eq!(report.effective_device.device, ComputeDevice::Cuda);
        fs::remove_dir_all(&base).ok();
    }
}
