//! SwitchModeUseCase: applies a device-mode preset to the settings file.
//!
//! # Transaction order
//!
//! ```text
//! parse mode ──► read live file ──► write backup ──► parse ──► mutate ──► save
//!     │                │                 │              │                   │
//! InvalidMode      NotFound          Io (abort)     Parse (abort)     Io (abort)
//! ```
//!
//! - The mode string is checked before any file is opened, so a typo never
//!   creates a backup.
//! - The backup is the exact bytes that were read, written before anything
//!   is parsed.  A corrupt settings file therefore still gets backed up.
//! - The live file is only ever replaced by the final atomic save.  Every
//!   earlier failure leaves it untouched.
//!
//! # Known limitation
//!
//! There is no file locking.  Two switches racing on the same path may
//! interleave their backup and save steps; the last save wins and the backup
//! may reflect either run.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::device::DeviceMode;
use crate::domain::settings::SettingsIssue;
use crate::infrastructure::storage::atomic::write_atomic;
use crate::infrastructure::storage::config_store::{self, read_document, ConfigError};

/// Literal suffix appended to the settings path to name the backup file.
pub const BACKUP_SUFFIX: &str = ".backup";

/// `path` with [`BACKUP_SUFFIX`] appended to the full file name.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// What a successful switch did.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSwitchOutcome {
    /// Mode in effect before the switch (absent or unusable keys read as
    /// `auto`).
    pub previous: DeviceMode,
    /// The `device` value now on disk.
    pub device: DeviceMode,
    /// The `force_cpu` value now on disk.
    pub force_cpu: bool,
    /// Where the pre-switch content was copied.
    pub backup_path: PathBuf,
    /// Problems found in the pre-switch document.  They do not block the
    /// switch.
    pub issues: Vec<SettingsIssue>,
}

/// Parses `mode` and applies it to the settings file at `path`.
///
/// # Errors
///
/// - [`ConfigError::InvalidMode`] if `mode` is not exactly `cpu`, `cuda` or
///   `auto`.  No file is touched.
/// - Anything [`apply_mode`] returns.
pub fn switch_mode(path: &Path, mode: &str) -> Result<ModeSwitchOutcome, ConfigError> {
    let mode: DeviceMode = mode.parse()?;
    apply_mode(path, mode)
}

/// Backs up, mutates and saves the settings file at `path`.
///
/// # Errors
///
/// - [`ConfigError::NotFound`] if `path` does not exist.  Nothing is written.
/// - [`ConfigError::Io`] if reading, the backup write or the final save
///   fails.
/// - [`ConfigError::Parse`] if the live file is not a JSON object.  The
///   backup has been written; the live file is unchanged.  Unusable values
///   inside a well-formed object (`"device": "gpu"`) are reported in
///   [`ModeSwitchOutcome::issues`] and do not stop the switch.
pub fn apply_mode(path: &Path, mode: DeviceMode) -> Result<ModeSwitchOutcome, ConfigError> {
    let original = read_document(path)?;

    let backup = backup_path(path);
    write_atomic(&backup, &original).map_err(ConfigError::io(&backup))?;
    info!(backup = %backup.display(), bytes = original.len(), "backed up settings");

    let mut document = config_store::parse(path, &original)?;
    let previous = document.settings().device_mode();
    let issues = document.issues();
    for issue in &issues {
        warn!(path = %path.display(), "settings issue: {issue}");
    }

    document.apply_mode(mode);
    config_store::save(path, &document)?;

    let settings = document.settings();
    info!(
        path = %path.display(),
        from = %previous,
        to = %mode,
        "switched device mode"
    );

    Ok(ModeSwitchOutcome {
        previous,
        device: settings.device_mode(),
        force_cpu: settings.cpu_forced(),
        backup_path: backup,
        issues,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
