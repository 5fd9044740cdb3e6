//! Mock toolchain for unit and integration testing.
//!
//! Records every call and answers from canned configuration, so the
//! bootstrap can be exercised without Python, pip or a GPU driver.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{GpuInfo, Toolchain, ToolchainError};

/// A call made against [`MockToolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
    PythonVersion {
        interpreter: PathBuf,
    },
    CreateVenv {
        interpreter: PathBuf,
        venv_dir: PathBuf,
    },
    InstallRequirements {
        interpreter: PathBuf,
        requirements: PathBuf,
    },
    QueryGpus,
}

/// A scripted implementation of [`Toolchain`].
///
/// By default Python is present, every step succeeds and no GPU tool is
/// installed.
pub struct MockToolchain {
    python_version: Option<String>,
    venv_fails: bool,
    install_fails: bool,
    gpus: Option<Vec<GpuInfo>>,
    calls: Mutex<Vec<ToolchainCall>>,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self {
            python_version: Some("Python 3.11.4".to_string()),
            venv_fails: false,
            install_fails: false,
            gpus: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes the version check fail as if Python were not installed.
    pub fn without_python(mut self) -> Self {
        self.python_version = None;
        self
    }

    /// Makes `nvidia-smi` report `gpus`.
    pub fn with_gpus(mut self, gpus: Vec<GpuInfo>) -> Self {
        self.gpus = Some(gpus);
        self
    }

    pub fn failing_venv(mut self) -> Self {
        self.venv_fails = true;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.install_fails = true;
        self
    }

    /// Returns a copy of the calls made so far, in order.
    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn record(&self, call: ToolchainCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

fn scripted_failure(program: &str) -> ToolchainError {
    ToolchainError::Failed {
        program: program.to_string(),
        status: "exit status: 1".to_string(),
        detail: "scripted failure".to_string(),
    }
}

impl Toolchain for MockToolchain {
    fn python_version(&self, interpreter: &Path) -> Result<String, ToolchainError> {
        self.record(ToolchainCall::PythonVersion {
            interpreter: interpreter.to_path_buf(),
        });
        self.python_version
            .clone()
            .ok_or_else(|| ToolchainError::NotFound {
                program: interpreter.to_string_lossy().into_owned(),
            })
    }

    fn create_venv(&self, interpreter: &Path, venv_dir: &Path) -> Result<(), ToolchainError> {
        self.record(ToolchainCall::CreateVenv {
            interpreter: interpreter.to_path_buf(),
            venv_dir: venv_dir.to_path_buf(),
        });
        if self.venv_fails {
            return Err(scripted_failure("venv"));
        }
        Ok(())
    }

    fn install_requirements(
        &self,
        interpreter: &Path,
        requirements: &Path,
    ) -> Result<(), ToolchainError> {
        self.record(ToolchainCall::InstallRequirements {
            interpreter: interpreter.to_path_buf(),
            requirements: requirements.to_path_buf(),
        });
        if self.install_fails {
            return Err(scripted_failure("pip"));
        }
        Ok(())
    }

    fn query_gpus(&self) -> Result<Vec<GpuInfo>, ToolchainError> {
        self.record(ToolchainCall::QueryGpus);
        self.gpus.clone().ok_or_else(|| ToolchainError::NotFound {
            program: "nvidia-smi".to_string(),
        })
    }
}
