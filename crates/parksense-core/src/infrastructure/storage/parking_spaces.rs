//! The parking spaces document.
//!
//! A JSON array of space definitions drawn by the operator in the detector.
//! The element format belongs to the detector; this module only guarantees
//! the file exists and is an array, so elements are kept as opaque
//! [`serde_json::Value`]s.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::atomic::write_atomic;
use super::config_store::{read_document, ConfigError, InitOutcome};

/// Writes an empty array to `path` unless a file is already there.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the check, directory creation or write
/// fails.
pub fn ensure_initialized(path: &Path) -> Result<InitOutcome, ConfigError> {
    if path.try_exists().map_err(ConfigError::io(path))? {
        debug!(path = %path.display(), "parking spaces file already present");
        return Ok(InitOutcome::AlreadyPresent);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(ConfigError::io(dir))?;
    }

    save(path, &[])?;
    info!(path = %path.display(), "created empty parking spaces file");
    Ok(InitOutcome::Created)
}

/// Loads the space list.  A missing file is an empty list, the same way the
/// detector treats it.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the content is not a JSON array, or
/// [`ConfigError::Io`] for read failures other than "not found".
pub fn load(path: &Path) -> Result<Vec<Value>, ConfigError> {
    let bytes = match read_document(path) {
        Ok(bytes) => bytes,
        Err(ConfigError::NotFound { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replaces the space list at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`].
pub fn save(path: &Path, spaces: &[Value]) -> Result<(), ConfigError> {
    let mut contents = serde_json::to_string_pretty(spaces).map_err(ConfigError::Serialize)?;
    contents.push('\n');
    write_atomic(path, contents.as_bytes()).map_err(ConfigError::io(path))?;
    debug!(path = %path.display(), count = spaces.len(), "saved parking spaces");
    Ok(())
}
