//! SHA-256 content hashing

use crate::error::IntegrityError;
use crate::layout::PROTECTED_FILES;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Hex SHA-256 of raw bytes (64 lowercase hex chars)
pub fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex SHA-256 of the exact bytes of `path`
///
/// No normalization is applied: any single-byte change changes the digest.
pub fn calculate_checksum(path: &Path) -> Result<String, IntegrityError> {
    match fs::read(path) {
        Ok(bytes) => Ok(checksum_bytes(&bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(IntegrityError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(IntegrityError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Check `path` against a previously computed digest
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<(), IntegrityError> {
    let actual = calculate_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(IntegrityError::Mismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Digest of digests over `(relative path, digest)` pairs, in the given order
pub fn combine_hashes<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();
    for (path, hash) in entries {
        hasher.update(path.as_bytes());
        hasher.update(b"  ");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Per-file digests of the protected files present in `dir`, in protected order
pub fn protected_file_hashes(dir: &Path) -> Result<Vec<(String, String)>, IntegrityError> {
    let mut hashes = Vec::new();
    for name in PROTECTED_FILES {
        match calculate_checksum(&dir.join(name)) {
            Ok(hash) => hashes.push((name.to_string(), hash)),
            Err(IntegrityError::Missing(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hashes)
}

/// One fingerprint for the state as a whole
///
/// Absent protected files are skipped, so the value is only stable while the
/// set of present files stays the same.
pub fn calculate_state_checksum(dir: &Path) -> Result<String, IntegrityError> {
    let hashes = protected_file_hashes(dir)?;
    Ok(combine_hashes(
        hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())),
    ))
}
