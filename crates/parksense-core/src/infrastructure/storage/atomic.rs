//! Atomic file replacement.
//!
//! Content is written to a uniquely named temporary file in the target's own
//! directory, flushed to disk, and then renamed over the target.  A rename
//! within one directory replaces the target in a single step, so a
//! concurrent reader sees either the old file or the new one, never a
//! truncated mix.  If anything fails before the rename the temporary file is
//! removed and the target is left as it was.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

/// Replaces `path` with `contents`.
///
/// The parent directory must already exist.
///
/// # Errors
///
/// Returns the underlying I/O error from create, write, sync or rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    let result = write_and_rename(&temp_path, path, contents);
    if result.is_err() {
        // Best effort; the original error is the one worth reporting.
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    {
        let mut file = fs::File::create(temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(temp_path, target)?;
    debug!(path = %target.display(), bytes = contents.len(), "replaced file atomically");
    Ok(())
}

/// `<dir>/.<file name>.<uuid>.tmp`, next to the target so the rename never
/// crosses a file-system boundary.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let temp_name = format!(".{file_name}.{}.tmp", Uuid::new_v4().simple());

    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(temp_name),
        _ => PathBuf::from(temp_name),
    }
}
