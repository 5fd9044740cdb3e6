//! [`Toolchain`] backed by real processes.
//!
//! `venv` creation and `pip install` inherit the console so the operator
//! sees pip's progress output.  The version check and GPU query capture
//! their output instead.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use super::{parse_gpu_csv, GpuInfo, Toolchain, ToolchainError};

/// Driver query tool shipped with the NVIDIA driver.
pub const GPU_QUERY_PROGRAM: &str = "nvidia-smi";

/// Runs the actual `python` and `nvidia-smi` executables.
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    gpu_query_program: String,
}

impl SystemToolchain {
    pub fn new() -> Self {
        Self {
            gpu_query_program: GPU_QUERY_PROGRAM.to_string(),
        }
    }
}

impl Default for SystemToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for SystemToolchain {
    fn python_version(&self, interpreter: &Path) -> Result<String, ToolchainError> {
        let output = capture(interpreter.as_os_str(), &["--version"])?;
        // Python 2 and some 3.x builds print the version on stderr.
        let text = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(String::from_utf8_lossy(text).trim().to_string())
    }

    fn create_venv(&self, interpreter: &Path, venv_dir: &Path) -> Result<(), ToolchainError> {
        let mut cmd = Command::new(interpreter);
        cmd.args([OsStr::new("-m"), OsStr::new("venv"), venv_dir.as_os_str()]);
        run_inherited(interpreter.as_os_str(), cmd)
    }

    fn install_requirements(
        &self,
        interpreter: &Path,
        requirements: &Path,
    ) -> Result<(), ToolchainError> {
        let mut cmd = Command::new(interpreter);
        cmd.args([
            OsStr::new("-m"),
            OsStr::new("pip"),
            OsStr::new("install"),
            OsStr::new("-r"),
            requirements.as_os_str(),
        ]);
        run_inherited(interpreter.as_os_str(), cmd)
    }

    fn query_gpus(&self) -> Result<Vec<GpuInfo>, ToolchainError> {
        let output = capture(
            OsStr::new(&self.gpu_query_program),
            &[
                "--query-gpu=name,driver_version,memory.total",
                "--format=csv,noheader",
            ],
        )?;
        Ok(parse_gpu_csv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Runs `program` with captured output and fails on a non-zero exit.
fn capture(program: &OsStr, args: &[&str]) -> Result<Output, ToolchainError> {
    debug!(program = %program.to_string_lossy(), ?args, "running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    if !output.status.success() {
        return Err(ToolchainError::Failed {
            program: program.to_string_lossy().into_owned(),
            status: output.status.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Runs a prepared command attached to the console.
fn run_inherited(program: &OsStr, mut cmd: Command) -> Result<(), ToolchainError> {
    debug!(command = ?cmd, "running");
    let status = cmd.status().map_err(|e| spawn_error(program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(ToolchainError::Failed {
            program: program.to_string_lossy().into_owned(),
            status: status.to_string(),
            detail: String::new(),
        })
    }
}

fn spawn_error(program: &OsStr, source: io::Error) -> ToolchainError {
    let program = program.to_string_lossy().into_owned();
    if source.kind() == io::ErrorKind::NotFound {
        ToolchainError::NotFound { program }
    } else {
        ToolchainError::Io { program, source }
    }
}
