//! Checkpoint snapshots
//!
//! A snapshot is a frozen copy of the state directory under
//! `checkpoints/snapshots/<id>/` plus its own `manifest.json`. Snapshots are
//! staged in a hidden sibling directory and renamed into place, so a
//! snapshot directory either carries a complete manifest or does not exist.
//! A snapshot without a manifest predates manifests (legacy) and verifies
//! as such.

use super::checksum::{calculate_checksum, combine_hashes};
use super::manifest::{check_combined_hash, diff_tables, store_checksums_with};
use crate::error::IntegrityError;
use crate::layout::{self, is_transient, PROTECTED_FILES, SNAPSHOT_MANIFEST_FILE};
use crate::models::{CheckpointId, SnapshotManifest, HASH_ALGORITHM, SNAPSHOT_FORMAT_VERSION};
use crate::storage::{atomic_write, TransactionManager};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Top-level directory of the state dir that holds snapshots (never copied)
const CHECKPOINTS_DIR: &str = "checkpoints";

/// Result of verifying a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotStatus {
    /// Manifest present and every file matched
    Verified { file_count: usize },
    /// No manifest: legacy snapshot, valid by definition
    Legacy,
}

/// Summary of one snapshot on disk
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInfo {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub file_count: Option<usize>,
    pub has_manifest: bool,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> IntegrityError + '_ {
    move |source| IntegrityError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Relative `/`-separated path -> digest for every file under `root`
fn hash_tree(root: &Path) -> Result<BTreeMap<String, String>, IntegrityError> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| IntegrityError::Io {
            path: root.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_transient(&name) || (entry.depth() == 1 && name == SNAPSHOT_MANIFEST_FILE) {
            continue;
        }

        let rel = relative_key(root, entry.path())?;
        files.insert(rel, calculate_checksum(entry.path())?);
    }

    Ok(files)
}

fn relative_key(root: &Path, path: &Path) -> Result<String, IntegrityError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| IntegrityError::Missing(path.to_path_buf()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Hash every file of `snapshot_dir` and write its `manifest.json`
pub fn create_snapshot_manifest(
    snapshot_dir: &Path,
    checkpoint_id: &str,
) -> Result<SnapshotManifest, IntegrityError> {
    let files = hash_tree(snapshot_dir)?;
    let combined_hash = combine_hashes(files.iter().map(|(p, h)| (p.as_str(), h.as_str())));

    let manifest = SnapshotManifest {
        format_version: SNAPSHOT_FORMAT_VERSION,
        checkpoint_id: checkpoint_id.to_string(),
        created_at: Utc::now(),
        algorithm: HASH_ALGORITHM.to_string(),
        file_count: files.len(),
        files,
        combined_hash,
    };

    let path = snapshot_dir.join(SNAPSHOT_MANIFEST_FILE);
    let mut content =
        serde_json::to_string_pretty(&manifest).map_err(|e| IntegrityError::InvalidManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    content.push('\n');
    atomic_write(&path, content)?;

    Ok(manifest)
}

fn load_snapshot_manifest(snapshot_dir: &Path) -> Result<Option<SnapshotManifest>, IntegrityError> {
    let path = snapshot_dir.join(SNAPSHOT_MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(IntegrityError::Io { path, source }),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| IntegrityError::InvalidManifest {
            path,
            reason: e.to_string(),
        })
}

/// Verify a snapshot directory against its own manifest
pub fn verify_snapshot_manifest(snapshot_dir: &Path) -> Result<SnapshotStatus, IntegrityError> {
    if !snapshot_dir.is_dir() {
        return Err(IntegrityError::SnapshotNotFound(
            snapshot_dir.display().to_string(),
        ));
    }

    let Some(manifest) = load_snapshot_manifest(snapshot_dir)? else {
        tracing::warn!(
            snapshot = %snapshot_dir.display(),
            "snapshot has no manifest, treating as legacy"
        );
        return Ok(SnapshotStatus::Legacy);
    };

    if manifest.format_version > SNAPSHOT_FORMAT_VERSION {
        return Err(IntegrityError::UnsupportedFormat {
            found: manifest.format_version,
            supported: SNAPSHOT_FORMAT_VERSION,
        });
    }
    if manifest.algorithm != HASH_ALGORITHM {
        return Err(IntegrityError::InvalidManifest {
            path: snapshot_dir.join(SNAPSHOT_MANIFEST_FILE),
            reason: format!("unsupported algorithm '{}'", manifest.algorithm),
        });
    }
    if manifest.file_count != manifest.files.len() {
        return Err(IntegrityError::InvalidManifest {
            path: snapshot_dir.join(SNAPSHOT_MANIFEST_FILE),
            reason: format!(
                "file_count {} does not match {} recorded files",
                manifest.file_count,
                manifest.files.len()
            ),
        });
    }

    let current = hash_tree(snapshot_dir)?;
    let (mismatched, missing, added) = diff_tables(&manifest.files, &current);
    if !mismatched.is_empty() || !missing.is_empty() || !added.is_empty() {
        return Err(IntegrityError::tampered(snapshot_dir, mismatched, missing, added));
    }
    check_combined_hash(
        &snapshot_dir.join(SNAPSHOT_MANIFEST_FILE),
        combine_hashes(current.iter().map(|(p, h)| (p.as_str(), h.as_str()))),
        &manifest.combined_hash,
    )?;

    Ok(SnapshotStatus::Verified {
        file_count: manifest.file_count,
    })
}

/// Copy the state directory into `checkpoints/snapshots/<checkpoint_id>/`
/// and write the snapshot manifest
pub fn create_snapshot(state_dir: &Path, checkpoint_id: &str) -> Result<PathBuf, IntegrityError> {
    if CheckpointId::parse(checkpoint_id).is_none() {
        return Err(IntegrityError::InvalidSnapshotId(checkpoint_id.to_string()));
    }

    let target = layout::snapshot_dir(state_dir, checkpoint_id);
    if target.exists() {
        return Err(IntegrityError::SnapshotExists(checkpoint_id.to_string()));
    }

    let staging = layout::snapshots_dir(state_dir).join(format!(".staging-{}", checkpoint_id));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
    }
    fs::create_dir_all(&staging).map_err(io_err(&staging))?;

    let manifest = match stage_snapshot(state_dir, &staging, checkpoint_id) {
        Ok(manifest) => manifest,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                tracing::warn!(staging = %staging.display(), error = %cleanup, "failed to remove snapshot staging");
            }
            return Err(e);
        }
    };
    fs::rename(&staging, &target).map_err(io_err(&target))?;

    tracing::info!(
        checkpoint = checkpoint_id,
        files = manifest.file_count,
        "snapshot created"
    );
    Ok(target)
}

/// Copy the state files into `staging` and write its manifest
fn stage_snapshot(
    state_dir: &Path,
    staging: &Path,
    checkpoint_id: &str,
) -> Result<SnapshotManifest, IntegrityError> {
    let walker = WalkDir::new(state_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == CHECKPOINTS_DIR));

    for entry in walker {
        let entry = entry.map_err(|e| IntegrityError::Io {
            path: state_dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() || is_transient(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(state_dir)
            .map_err(|_| IntegrityError::Missing(entry.path().to_path_buf()))?;
        let dest = staging.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        fs::copy(entry.path(), &dest).map_err(io_err(entry.path()))?;
    }

    create_snapshot_manifest(staging, checkpoint_id)
}

/// All snapshots, oldest first
pub fn list_snapshots(state_dir: &Path) -> Result<Vec<SnapshotInfo>, IntegrityError> {
    let root = layout::snapshots_dir(state_dir);
    let entries = match fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(IntegrityError::Io { path: root, source }),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err(&root))?;
        let id = entry.file_name().to_string_lossy().to_string();
        if id.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        let path = entry.path();
        let manifest = load_snapshot_manifest(&path).ok().flatten();
        let created_at = match &manifest {
            Some(m) => m.created_at,
            None => fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .map_err(io_err(&path))?,
        };

        snapshots.push(SnapshotInfo {
            id,
            file_count: manifest.as_ref().map(|m| m.file_count),
            has_manifest: manifest.is_some(),
            created_at,
            path,
        });
    }

    snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(snapshots)
}

/// Restore the state directory from a snapshot through `tx`
///
/// The snapshot is verified first; a tampered snapshot is never restored.
/// Protected files absent from the snapshot are removed and `checksums.json`
/// is rebuilt for the restored files. Returns the restored relative paths.
pub fn restore_snapshot_with(
    state_dir: &Path,
    checkpoint_id: &str,
    tx: &mut TransactionManager,
) -> Result<Vec<String>, IntegrityError> {
    let snapshot = layout::snapshot_dir(state_dir, checkpoint_id);
    verify_snapshot_manifest(&snapshot)?;

    let files = hash_tree(&snapshot)?;
    for rel in files.keys() {
        let source = snapshot.join(rel);
        let content = fs::read(&source).map_err(io_err(&source))?;
        tx.write(&state_dir.join(rel), content)?;
    }

    for name in PROTECTED_FILES {
        if !files.contains_key(*name) {
            tx.remove(&state_dir.join(name))?;
        }
    }
    store_checksums_with(state_dir, tx)?;

    tracing::info!(checkpoint = checkpoint_id, files = files.len(), "snapshot restored");
    Ok(files.into_keys().collect())
}

/// Restore the state directory from a snapshot in its own transaction
pub fn restore_snapshot(state_dir: &Path, checkpoint_id: &str) -> Result<Vec<String>, IntegrityError> {
    let mut tx = TransactionManager::new(state_dir);
    tx.run("restore-snapshot", |tx| restore_snapshot_with(state_dir, checkpoint_id, tx))
}

/// Delete the oldest snapshots so that at most `keep` remain
pub fn prune_snapshots(state_dir: &Path, keep: usize) -> Result<Vec<String>, IntegrityError> {
    let snapshots = list_snapshots(state_dir)?;
    let excess = snapshots.len().saturating_sub(keep);

    let mut removed = Vec::new();
    for info in snapshots.into_iter().take(excess) {
        fs::remove_dir_all(&info.path).map_err(io_err(&info.path))?;
        tracing::debug!(snapshot = %info.id, "snapshot pruned");
        removed.push(info.id);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{store_checksums, verify_checksums};
    use crate::layout::{HANDOFF_FILE, LOG_FILE, MANIFEST_FILE, STATE_FILE};
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join(STATE_FILE), "current_checkpoint: CP_research_001\n").unwrap();
        fs::write(dir.join(LOG_FILE), "{}\n").unwrap();
        fs::create_dir_all(dir.join("notes")).unwrap();
        fs::write(dir.join("notes").join("a.md"), "nested").unwrap();
        fs::write(dir.join("STATE.yaml.abc.bak"), "transient").unwrap();
        temp_dir
    }

    #[test]
    fn test_create_and_verify_snapshot() {
        let temp_dir = setup();
        let snap = create_snapshot(temp_dir.path(), "CP_research_001").unwrap();

        assert!(snap.join(STATE_FILE).exists());
        assert!(snap.join("notes/a.md").exists());
        assert!(!snap.join("STATE.yaml.abc.bak").exists());
        assert!(snap.join(SNAPSHOT_MANIFEST_FILE).exists());

        let status = verify_snapshot_manifest(&snap).unwrap();
        assert_eq!(status, SnapshotStatus::Verified { file_count: 3 });
    }

    #[test]
    fn test_snapshot_does_not_copy_other_snapshots() {
        let temp_dir = setup();
        create_snapshot(temp_dir.path(), "CP_research_001").unwrap();
        let second = create_snapshot(temp_dir.path(), "CP_research_002").unwrap();
        assert!(!second.join("checkpoints").exists());
    }

    #[test]
    fn test_duplicate_and_invalid_ids_rejected() {
        let temp_dir = setup();
        create_snapshot(temp_dir.path(), "CP_research_001").unwrap();
        assert!(matches!(
            create_snapshot(temp_dir.path(), "CP_research_001"),
            Err(IntegrityError::SnapshotExists(_))
        ));
        assert!(matches!(
            create_snapshot(temp_dir.path(), "../escape"),
            Err(IntegrityError::InvalidSnapshotId(_))
        ));
    }

    #[test]
    fn test_legacy_snapshot_verifies() {
        let temp_dir = TempDir::new().unwrap();
        let legacy = layout::snapshot_dir(temp_dir.path(), "CP_planning_003");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join(STATE_FILE), "old format").unwrap();

        assert_eq!(verify_snapshot_manifest(&legacy).unwrap(), SnapshotStatus::Legacy);
    }

    #[test]
    fn test_tampered_snapshot_detected() {
        let temp_dir = setup();
        let snap = create_snapshot(temp_dir.path(), "CP_research_001").unwrap();
        fs::write(snap.join(LOG_FILE), "{}\n{\"forged\":true}\n").unwrap();
        fs::write(snap.join(HANDOFF_FILE), "sneaked in").unwrap();

        match verify_snapshot_manifest(&snap).unwrap_err() {
            IntegrityError::Tampered {
                mismatched, added, ..
            } => {
                assert_eq!(mismatched, vec![LOG_FILE.to_string()]);
                assert_eq!(added, vec![HANDOFF_FILE.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let err = verify_snapshot_manifest(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IntegrityError::SnapshotNotFound(_)));
    }

    #[test]
    fn test_restore_snapshot() {
        let temp_dir = setup();
        let dir = temp_dir.path();
        create_snapshot(dir, "CP_research_001").unwrap();

        fs::write(dir.join(STATE_FILE), "current_checkpoint: CP_research_009\n").unwrap();
        fs::write(dir.join(HANDOFF_FILE), "newer note").unwrap();

        let mut tx = TransactionManager::new(dir);
        tx.begin("restore").unwrap();
        let restored = restore_snapshot_with(dir, "CP_research_001", &mut tx).unwrap();
        tx.commit().unwrap();

        assert!(restored.contains(&STATE_FILE.to_string()));
        assert_eq!(
            fs::read_to_string(dir.join(STATE_FILE)).unwrap(),
            "current_checkpoint: CP_research_001\n"
        );
        assert!(!dir.join(HANDOFF_FILE).exists());
    }

    #[test]
    fn test_forged_combined_hash_rejected() {
        let temp_dir = setup();
        let snap = create_snapshot(temp_dir.path(), "CP_research_001").unwrap();
        let path = snap.join(SNAPSHOT_MANIFEST_FILE);
        let mut manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        manifest["combined_hash"] = serde_json::json!("f".repeat(64));
        fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();

        let err = verify_snapshot_manifest(&snap).unwrap_err();
        assert!(matches!(err, IntegrityError::InvalidManifest { .. }), "{err}");
        assert!(restore_snapshot(temp_dir.path(), "CP_research_001").is_err());
    }

    #[test]
    fn test_failed_snapshot_leaves_no_staging() {
        let temp_dir = setup();
        let dir = temp_dir.path();
        // A directory where the snapshot manifest should go makes the manifest write fail
        fs::create_dir_all(dir.join(SNAPSHOT_MANIFEST_FILE)).unwrap();
        fs::write(dir.join(SNAPSHOT_MANIFEST_FILE).join("x"), "blocker").unwrap();

        assert!(create_snapshot(dir, "CP_research_001").is_err());

        let leftovers: Vec<_> = fs::read_dir(layout::snapshots_dir(dir))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
        assert!(list_snapshots(dir).unwrap().is_empty());
    }

    #[test]
    fn test_restore_legacy_snapshot_refreshes_checksums() {
        let temp_dir = setup();
        let dir = temp_dir.path();
        store_checksums(dir).unwrap();
        let snap = create_snapshot(dir, "CP_research_001").unwrap();
        fs::remove_file(snap.join(SNAPSHOT_MANIFEST_FILE)).unwrap();
        fs::remove_file(snap.join(MANIFEST_FILE)).unwrap();

        fs::write(dir.join(STATE_FILE), "current_checkpoint: CP_research_002\n").unwrap();
        fs::write(dir.join(LOG_FILE), "{}\n{}\n").unwrap();
        store_checksums(dir).unwrap();

        restore_snapshot(dir, "CP_research_001").unwrap();
        assert_eq!(
            fs::read_to_string(dir.join(STATE_FILE)).unwrap(),
            "current_checkpoint: CP_research_001\n"
        );
        assert!(verify_checksums(dir).is_ok());
    }

    #[test]
    fn test_list_and_prune() {
        let temp_dir = setup();
        let dir = temp_dir.path();
        for id in ["CP_research_001", "CP_research_002", "CP_research_003"] {
            create_snapshot(dir, id).unwrap();
        }

        let listed: Vec<_> = list_snapshots(dir).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, vec!["CP_research_001", "CP_research_002", "CP_research_003"]);

        let removed = prune_snapshots(dir, 1).unwrap();
        assert_eq!(removed, vec!["CP_research_001", "CP_research_002"]);
        assert_eq!(list_snapshots(dir).unwrap().len(), 1);
    }
}
