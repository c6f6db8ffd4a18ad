//! checksums.json - manifest of the protected state files

use super::checksum::{combine_hashes, protected_file_hashes};
use crate::error::IntegrityError;
use crate::layout::MANIFEST_FILE;
use crate::models::{ChecksumManifest, HASH_ALGORITHM};
use crate::storage::TransactionManager;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of a successful manifest verification
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    /// Files whose digests matched
    pub verified: Vec<String>,
    pub combined_hash: String,
}

/// Compute (but do not store) the manifest for `dir`
pub fn build_manifest(dir: &Path) -> Result<ChecksumManifest, IntegrityError> {
    let hashes = protected_file_hashes(dir)?;
    let combined_hash = combine_hashes(hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())));

    Ok(ChecksumManifest {
        generated_at: Utc::now(),
        algorithm: HASH_ALGORITHM.to_string(),
        files: hashes.into_iter().collect(),
        combined_hash,
    })
}

/// Compute and persist `checksums.json` for `dir`
pub fn store_checksums(dir: &Path) -> Result<ChecksumManifest, IntegrityError> {
    let mut tx = TransactionManager::new(dir);
    store_checksums_with(dir, &mut tx)
}

/// Like [`store_checksums`], writing through `tx` so an open transaction
/// backs up the previous manifest
pub fn store_checksums_with(
    dir: &Path,
    tx: &mut TransactionManager,
) -> Result<ChecksumManifest, IntegrityError> {
    let manifest = build_manifest(dir)?;
    let path = dir.join(MANIFEST_FILE);
    let mut content = serde_json::to_string_pretty(&manifest).map_err(|e| {
        IntegrityError::InvalidManifest {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;
    content.push('\n');
    tx.write(&path, content)?;

    tracing::debug!(
        dir = %dir.display(),
        files = manifest.files.len(),
        combined = %manifest.combined_hash,
        "checksums stored"
    );
    Ok(manifest)
}

/// Read `checksums.json` from `dir`
pub fn load_manifest(dir: &Path) -> Result<ChecksumManifest, IntegrityError> {
    let path = dir.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(IntegrityError::NoManifest(path));
        }
        Err(source) => return Err(IntegrityError::Io { path, source }),
    };

    let manifest: ChecksumManifest =
        serde_json::from_str(&content).map_err(|e| IntegrityError::InvalidManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    if manifest.algorithm != HASH_ALGORITHM {
        return Err(IntegrityError::InvalidManifest {
            path,
            reason: format!("unsupported algorithm '{}'", manifest.algorithm),
        });
    }

    Ok(manifest)
}

/// Compare two path -> digest tables; returns (mismatched, missing, added)
pub(crate) fn diff_tables(
    expected: &BTreeMap<String, String>,
    actual: &BTreeMap<String, String>,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut mismatched = Vec::new();
    let mut missing = Vec::new();
    let mut added = Vec::new();

    for (path, hash) in expected {
        match actual.get(path) {
            Some(current) if current == hash => {}
            Some(_) => mismatched.push(path.clone()),
            None => missing.push(path.clone()),
        }
    }
    for path in actual.keys() {
        if !expected.contains_key(path) {
            added.push(path.clone());
        }
    }

    (mismatched, missing, added)
}

/// Compare a recomputed combined hash with the one a manifest recorded
pub(crate) fn check_combined_hash(
    manifest_path: &Path,
    computed: String,
    recorded: &str,
) -> Result<String, IntegrityError> {
    if computed != recorded {
        return Err(IntegrityError::InvalidManifest {
            path: manifest_path.to_path_buf(),
            reason: format!(
                "combined_hash {} does not match recorded file digests ({})",
                recorded, computed
            ),
        });
    }
    Ok(computed)
}

/// Recompute digests and compare them with `checksums.json`
///
/// Returns `NoManifest` when the manifest was never written, `Tampered`
/// naming every modified, missing and added file, and `InvalidManifest`
/// when the recorded combined hash does not cover the recorded digests.
pub fn verify_checksums(dir: &Path) -> Result<IntegrityReport, IntegrityError> {
    let manifest = load_manifest(dir)?;
    let hashes = protected_file_hashes(dir)?;
    let computed = combine_hashes(hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())));
    let current: BTreeMap<String, String> = hashes.into_iter().collect();

    let (mismatched, missing, added) = diff_tables(&manifest.files, &current);
    if !mismatched.is_empty() || !missing.is_empty() || !added.is_empty() {
        let err = IntegrityError::tampered(dir, mismatched, missing, added);
        tracing::warn!(error = %err, "checksum verification failed");
        return Err(err);
    }

    let combined_hash =
        check_combined_hash(&dir.join(MANIFEST_FILE), computed, &manifest.combined_hash)
            .inspect_err(|e| tracing::warn!(error = %e, "checksum verification failed"))?;

    Ok(IntegrityReport {
        verified: current.into_keys().collect(),
        combined_hash,
    })
}
