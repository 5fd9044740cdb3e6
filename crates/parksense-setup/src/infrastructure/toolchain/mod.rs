//! External programs used by the bootstrap.
//!
//! The detector is a Python program, so setting it up means running the
//! Python interpreter (version check, `venv`, `pip`) and, optionally,
//! `nvidia-smi` to see whether a GPU is present.
//!
//! # Testability
//!
//! The [`Toolchain`] trait lets tests run the whole bootstrap against
//! [`mock::MockToolchain`] without Python or a GPU on the test machine.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod mock;
pub mod system;

/// One GPU as reported by the driver query tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
    pub driver_version: String,
    /// Total memory as printed by the driver, e.g. `"12288 MiB"`.
    pub memory_total: String,
}

/// Error type for external program invocations.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The program is not installed or not on `PATH`.
    #[error("'{program}' was not found")]
    NotFound { program: String },

    /// The program ran but reported failure.
    #[error("'{program}' failed ({status}){}", fmt_detail(.detail))]
    Failed {
        program: String,
        status: String,
        detail: String,
    },

    /// The program could not be started for another reason.
    #[error("failed to run '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn fmt_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

/// Abstraction over the programs the bootstrap runs.
pub trait Toolchain {
    /// Returns the interpreter's version string, e.g. `"Python 3.11.4"`.
    fn python_version(&self, interpreter: &Path) -> Result<String, ToolchainError>;

    /// Creates a virtual environment at `venv_dir` using `interpreter`.
    fn create_venv(&self, interpreter: &Path, venv_dir: &Path) -> Result<(), ToolchainError>;

    /// Installs the packages listed in `requirements` with `interpreter -m pip`.
    fn install_requirements(
        &self,
        interpreter: &Path,
        requirements: &Path,
    ) -> Result<(), ToolchainError>;

    /// Lists the GPUs visible to the driver.  An empty list means the tool
    /// ran but found none.
    fn query_gpus(&self) -> Result<Vec<GpuInfo>, ToolchainError>;
}

/// Path of the Python interpreter inside a virtual environment.
pub fn venv_interpreter(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

/// Parses `nvidia-smi --query-gpu=name,driver_version,memory.total
/// --format=csv,noheader` output.  Lines that do not have three fields are
/// skipped.
pub fn parse_gpu_csv(output: &str) -> Vec<GpuInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, ',').map(str::trim);
            let name = fields.next().filter(|s| !s.is_empty())?;
            let driver_version = fields.next()?;
            let memory_total = fields.next()?;
            Some(GpuInfo {
                name: name.to_string(),
                driver_version: driver_version.to_string(),
                memory_total: memory_total.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpu_csv_single_gpu() {
        // Arrange
        let output = "NVIDIA GeForce RTX 3060, 535.54.03, 12288 MiB\n";

        // Act
        let gpus = parse_gpu_csv(output);

        // Assert
        assert_eq!(
            gpus,
            vec![GpuInfo {
                name: "NVIDIA GeForce RTX 3060".to_string(),
                driver_version: "535.54.03".to_string(),
                memory_total: "12288 MiB".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_gpu_csv_multiple_gpus_and_blank_lines() {
        let output = "Tesla T4, 525.85.12, 15360 MiB\n\nTesla T4, 525.85.12, 15360 MiB\n";
        assert_eq!(parse_gpu_csv(output).len(), 2);
    }

    #[test]
    fn test_parse_gpu_csv_skips_malformed_lines() {
        let output = "No devices were found\n";
        assert!(parse_gpu_csv(output).is_empty());
    }

    #[test]
    fn test_venv_interpreter_is_inside_venv() {
        let interpreter = venv_interpreter(Path::new("/opt/parksense/venv"));
        assert!(interpreter.starts_with("/opt/parksense/venv"));
    }

    #[test]
    fn test_failed_error_message_includes_detail() {
        let err = ToolchainError::Failed {
            program: "pip".to_string(),
            status: "exit status: 1".to_string(),
            detail: "no matching distribution".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'pip' failed (exit status: 1): no matching distribution"
        );
    }

    #[test]
    fn test_failed_error_message_without_detail() {
        let err = ToolchainError::Failed {
            program: "pip".to_string(),
            status: "exit status: 1".to_string(),
            detail: String::new(),
        };
        assert_eq!(err.to_string(), "'pip' failed (exit status: 1)");
    }
}
