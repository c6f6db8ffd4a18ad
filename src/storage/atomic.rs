//! Atomic single-file writes
//!
//! Content is staged in a temporary file next to the target (same volume),
//! synced, then renamed over the target in one step. A reader sees either the
//! old bytes or the new bytes, never a partial file. A staged write that is
//! dropped before commit removes its temporary file.

use crate::error::WriteError;
use crate::layout::{BACKUP_EXTENSION, TEMP_PREFIX};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully written temporary file waiting to replace its target
pub struct StagedWrite {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedWrite {
    /// Path of the temporary file holding the staged content
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Target that `commit` will replace
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the staged file over the target
    pub fn commit(self) -> Result<(), WriteError> {
        let target = self.target;
        self.temp.persist(&target).map_err(|e| WriteError::Rename {
            path: target.clone(),
            source: e.error,
        })?;
        tracing::debug!(path = %target.display(), "atomic write committed");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Result<PathBuf, WriteError> {
    if path.file_name().is_none() {
        return Err(WriteError::InvalidPath(path.to_path_buf()));
    }
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.to_path_buf()),
        _ => Ok(PathBuf::from(".")),
    }
}

/// Write `content` to a temporary sibling of `path` without touching `path`
pub fn stage_write(path: &Path, content: &[u8]) -> Result<StagedWrite, WriteError> {
    let parent = parent_dir(path)?;
    fs::create_dir_all(&parent).map_err(|source| WriteError::CreateParent {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_err = |source: io::Error| WriteError::TempWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(&parent)
        .map_err(temp_err)?;
    temp.write_all(content).map_err(temp_err)?;
    temp.flush().map_err(temp_err)?;
    temp.as_file().sync_all().map_err(temp_err)?;

    // Keep the target's mode when replacing an existing file
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions()).map_err(temp_err)?;
    }

    Ok(StagedWrite {
        target: path.to_path_buf(),
        temp,
    })
}

/// Replace `path` with exactly `content`
///
/// Missing parent directories are created. On failure the original file is
/// untouched and no temporary file is left behind.
pub fn atomic_write(path: &Path, content: impl AsRef<[u8]>) -> Result<(), WriteError> {
    stage_write(path, content.as_ref())?.commit()
}

fn read_existing(path: &Path) -> Result<Vec<u8>, WriteError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(WriteError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Append `content` to `path` with the same all-or-nothing guarantee
pub fn atomic_append(path: &Path, content: impl AsRef<[u8]>) -> Result<(), WriteError> {
    let mut bytes = read_existing(path)?;
    bytes.extend_from_slice(content.as_ref());
    atomic_write(path, bytes)
}

/// Append one line to `path`, terminating a dangling last line first
pub fn atomic_append_line(path: &Path, line: &str) -> Result<(), WriteError> {
    let mut bytes = read_existing(path)?;
    if !bytes.is_empty() && !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    atomic_write(path, bytes)
}

/// Copy `path` to a unique sibling backup, preserving permissions
///
/// Returns `None` when `path` does not exist.
pub fn safe_backup(path: &Path) -> Result<Option<PathBuf>, WriteError> {
    if !path.exists() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| WriteError::InvalidPath(path.to_path_buf()))?;
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let backup = path.with_file_name(format!("{}.{}.{}", file_name, &tag[..12], BACKUP_EXTENSION));

    fs::copy(path, &backup).map_err(|source| WriteError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), backup = %backup.display(), "backup created");

    Ok(Some(backup))
}

/// Remove leftover temporary files of the atomic writer in `dir`
///
/// Returns the number of files removed.
pub fn cleanup_temp_artifacts(dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(TEMP_PREFIX) && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
