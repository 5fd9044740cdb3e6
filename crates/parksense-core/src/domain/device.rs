//! Compute-device modes.
//!
//! The settings document stores the operator's preference as one of three
//! lowercase literals (`"cpu"`, `"cuda"`, `"auto"`) plus a `force_cpu`
//! flag.  Internally the preference is the closed enum [`DeviceMode`]; the
//! literals only exist at the JSON boundary.
//!
//! The preference is not the whole story: a `cuda` request on a machine
//! without a usable GPU still runs on the CPU.  [`resolve_device`] applies
//! the same startup rule the detector applies, so the tools can tell the
//! operator which backend will actually be used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator-selected compute-device mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Always run inference on the CPU.
    Cpu,
    /// Prefer the CUDA GPU; falls back to the CPU if none is usable.
    Cuda,
    /// Use the GPU when one is available, otherwise the CPU.
    #[default]
    Auto,
}

/// Returned when a string is not one of the three mode literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown device mode '{0}' (expected one of: cpu, cuda, auto)")]
pub struct UnknownDeviceMode(pub String);

impl DeviceMode {
    /// All modes, in the order they are listed to the operator.
    pub const ALL: [DeviceMode; 3] = [DeviceMode::Cpu, DeviceMode::Cuda, DeviceMode::Auto];

    /// The literal stored in the settings document.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceMode::Cpu => "cpu",
            DeviceMode::Cuda => "cuda",
            DeviceMode::Auto => "auto",
        }
    }

    /// The `force_cpu` value that is consistent with this mode.
    pub fn forces_cpu(self) -> bool {
        matches!(self, DeviceMode::Cpu)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceMode {
    type Err = UnknownDeviceMode;

    /// Parses a mode literal.  Matching is exact and case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(DeviceMode::Cpu),
            "cuda" => Ok(DeviceMode::Cuda),
            "auto" => Ok(DeviceMode::Auto),
            other => Err(UnknownDeviceMode(other.to_string())),
        }
    }
}

/// The backend the detector ends up running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Cuda,
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu => f.write_str("CPU"),
            ComputeDevice::Cuda => f.write_str("CUDA"),
        }
    }
}

/// Why [`resolve_device`] chose the backend it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceReason {
    /// `force_cpu` is set.
    ForcedCpu,
    /// The requested device is available and used as-is.
    Requested,
    /// `cuda` was requested but no usable GPU is present.
    CudaUnavailable,
    /// `auto` picked whatever is available.
    AutoDetected,
}

/// Result of applying the startup rule to a mode preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveDevice {
    pub device: ComputeDevice,
    pub reason: DeviceReason,
}

impl fmt::Display for EffectiveDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DeviceReason::ForcedCpu => write!(f, "{} (force_cpu is set)", self.device),
            DeviceReason::Requested => write!(f, "{} (requested)", self.device),
            DeviceReason::CudaUnavailable => {
                write!(f, "{} (CUDA requested but not available)", self.device)
            }
            DeviceReason::AutoDetected => write!(f, "{} (auto-detected)", self.device),
        }
    }
}

/// Decides which backend the detector will use.
///
/// `force_cpu` always wins.  An explicit `cuda` request degrades to the CPU
/// when `cuda_available` is false, and `auto` takes the GPU whenever it can.
pub fn resolve_device(mode: DeviceMode, force_cpu: bool, cuda_available: bool) -> EffectiveDevice {
    if force_cpu {
        return EffectiveDevice {
            device: ComputeDevice::Cpu,
            reason: DeviceReason::ForcedCpu,
        };
    }

    match mode {
        DeviceMode::Cpu => EffectiveDevice {
            device: ComputeDevice::Cpu,
            reason: DeviceReason::Requested,
        },
        DeviceMode::Cuda if cuda_available => EffectiveDevice {
            device: ComputeDevice::Cuda,
            reason: DeviceReason::Requested,
        },
        DeviceMode::Cuda => EffectiveDevice {
            device: ComputeDevice::Cpu,
            reason: DeviceReason::CudaUnavailable,
        },
        DeviceMode::Auto => EffectiveDevice {
            device: if cuda_available {
                ComputeDevice::Cuda
            } else {
                ComputeDevice::Cpu
            },
            reason: DeviceReason::AutoDetected,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
