//! Checksum manifest formats
//!
//! - `checksums.json` in the state directory ([`ChecksumManifest`])
//! - `manifest.json` inside each snapshot directory ([`SnapshotManifest`])

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hash algorithm recorded in manifests
pub const HASH_ALGORITHM: &str = "sha256";

/// Current snapshot manifest format
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Per-file and combined hashes of the protected state files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumManifest {
    pub generated_at: DateTime<Utc>,
    pub algorithm: String,
    /// Relative path -> hex digest
    pub files: BTreeMap<String, String>,
    pub combined_hash: String,
}

impl ChecksumManifest {
    /// Same content ignoring `generated_at`
    pub fn same_content(&self, other: &ChecksumManifest) -> bool {
        self.algorithm == other.algorithm
            && self.files == other.files
            && self.combined_hash == other.combined_hash
    }
}

/// Self-describing manifest of a frozen snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    pub checkpoint_id: String,
    pub created_at: DateTime<Utc>,
    pub algorithm: String,
    pub file_count: usize,
    pub files: BTreeMap<String, String>,
    pub combined_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_ignores_timestamp() {
        let mut files = BTreeMap::new();
        files.insert("STATE.yaml".to_string(), "ab".repeat(32));
        let a = ChecksumManifest {
            generated_at: Utc::now(),
            algorithm: HASH_ALGORITHM.to_string(),
            files: files.clone(),
            combined_hash: "cd".repeat(32),
        };
        let mut b = a.clone();
        b.generated_at = a.generated_at + chrono::Duration::seconds(30);
        assert!(a.same_content(&b));

        b.files.insert("HANDOFF.md".to_string(), "ef".repeat(32));
        assert!(!a.same_content(&b));
    }
}
