//! JSON persistence for the detector settings document.
//!
//! The settings file lives at `<base>/config/settings.json` and is read by
//! the detector on startup.  This module guarantees three things about it:
//!
//! - It exists: [`ensure_initialized`] writes the default document when the
//!   file is missing and leaves an existing file byte-for-byte alone.
//! - It parses: [`load`] rejects anything that is not a JSON object.  Known
//!   keys with unusable values are reported, not rejected, so the mode
//!   switch can still repair a bad `device` entry.
//! - It is never half-written: [`save`] goes through
//!   [`write_atomic`](super::atomic::write_atomic).
//!
//! # Preserving operator edits
//!
//! A [`SettingsDocument`] keeps the parsed JSON object as-is (key order,
//! unknown keys, absent keys) next to the typed [`Settings`] view.  Missing
//! keys are backfilled with their defaults in the typed view only, so a save
//! after [`SettingsDocument::apply_mode`] rewrites exactly `device` and
//! `force_cpu` and nothing else.
//!
//! Values are preserved, not their spelling: numbers are re-printed by
//! `serde_json`, so `1e2` is written back as `100.0`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::atomic::write_atomic;
use crate::domain::device::{DeviceMode, UnknownDeviceMode};
use crate::domain::settings::{Settings, SettingsIssue};

pub const DEVICE_KEY: &str = "device";
pub const FORCE_CPU_KEY: &str = "force_cpu";

/// Error type for document store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file was expected to exist but does not.
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The file is not valid JSON, or its root is not the expected shape.
    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A file system I/O error occurred.
    #[error("I/O error accessing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document could not be serialized to JSON.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// An operator-supplied mode string is not one of the known literals.
    #[error(transparent)]
    InvalidMode(#[from] UnknownDeviceMode),
}

impl ConfigError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> ConfigError + '_ {
        move |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What [`ensure_initialized`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The file was missing and the default document was written.
    Created,
    /// The file already existed and was not touched.
    AlreadyPresent,
}

// ── Settings document ─────────────────────────────────────────────────────────

/// A parsed settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDocument {
    fields: Map<String, Value>,
    settings: Settings,
    field_issues: Vec<SettingsIssue>,
}

impl SettingsDocument {
    /// Builds a document whose on-disk form is exactly `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if `settings` cannot be expressed
    /// as a JSON object.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let value = serde_json::to_value(settings).map_err(ConfigError::Serialize)?;
        let fields: Map<String, Value> =
            serde_json::from_value(value).map_err(ConfigError::Serialize)?;
        Ok(Self {
            fields,
            settings: settings.clone(),
            field_issues: Vec::new(),
        })
    }

    /// Wraps a raw JSON object.
    ///
    /// Known keys holding unusable values (`"device": "gpu"`) do not fail:
    /// the typed view falls back to the default for them and
    /// [`issues`](Self::issues) lists them.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let (settings, field_issues) = Settings::from_fields(&fields);
        Self {
            fields,
            settings,
            field_issues,
        }
    }

    /// Typed view with missing keys backfilled from the defaults.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Unusable values found when the document was read, followed by the
    /// range and consistency checks of [`Settings::validate`].
    pub fn issues(&self) -> Vec<SettingsIssue> {
        let mut issues = self.field_issues.clone();
        issues.extend(self.settings.validate());
        issues
    }

    /// The JSON object as it will be written.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Sets `device` and `force_cpu` to the preset for `mode`.
    ///
    /// Existing keys keep their position in the object; missing keys are
    /// appended.  No other key is touched.
    pub fn apply_mode(&mut self, mode: DeviceMode) {
        self.fields.insert(
            DEVICE_KEY.to_string(),
            Value::String(mode.as_str().to_string()),
        );
        self.fields
            .insert(FORCE_CPU_KEY.to_string(), Value::Bool(mode.forces_cpu()));
        self.settings.device = Some(mode);
        self.settings.force_cpu = Some(mode.forces_cpu());
        self.field_issues.retain(|issue| {
            !matches!(
                issue,
                SettingsIssue::InvalidValue { field, .. }
                    if *field == DEVICE_KEY || *field == FORCE_CPU_KEY
            )
        });
    }

    /// Pretty-printed JSON with 2-space indentation and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, ConfigError> {
        let mut out = serde_json::to_string_pretty(&self.fields).map_err(ConfigError::Serialize)?;
        out.push('\n');
        Ok(out)
    }
}

// ── Store operations ──────────────────────────────────────────────────────────

/// Writes the default settings document to `path` unless a file is already
/// there.
///
/// Missing parent directories are created.  Calling this on an existing file
/// is a no-op: content and key order are left exactly as they are.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the existence check, directory creation or
/// write fails (e.g. the parent directory is not writable).
pub fn ensure_initialized(path: &Path) -> Result<InitOutcome, ConfigError> {
    if path.try_exists().map_err(ConfigError::io(path))? {
        debug!(path = %path.display(), "settings file already present");
        return Ok(InitOutcome::AlreadyPresent);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(ConfigError::io(dir))?;
    }

    let document = SettingsDocument::from_settings(&Settings::default())?;
    save(path, &document)?;
    info!(path = %path.display(), "wrote default settings");
    Ok(InitOutcome::Created)
}

/// Reads and parses the settings document at `path`.
///
/// # Errors
///
/// - [`ConfigError::NotFound`] if the file does not exist.
/// - [`ConfigError::Io`] for any other read failure.
/// - [`ConfigError::Parse`] if the content is not a JSON object.
pub fn load(path: &Path) -> Result<SettingsDocument, ConfigError> {
    let bytes = read_document(path)?;
    parse(path, &bytes)
}

/// Parses raw file content read from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid JSON or a root that is not an
/// object.  Ill-typed values are not errors; see
/// [`SettingsDocument::issues`].
pub fn parse(path: &Path, bytes: &[u8]) -> Result<SettingsDocument, ConfigError> {
    let fields: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(SettingsDocument::from_fields(fields))
}

/// Atomically replaces the file at `path` with `document`.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`].
pub fn save(path: &Path, document: &SettingsDocument) -> Result<(), ConfigError> {
    let contents = document.to_pretty_json()?;
    write_atomic(path, contents.as_bytes()).map_err(ConfigError::io(path))?;
    debug!(path = %path.display(), "saved settings");
    Ok(())
}

/// Reads the raw bytes of a document, mapping a missing file to
/// [`ConfigError::NotFound`].
pub(crate) fn read_document(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
