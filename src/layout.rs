//! State directory layout
//!
//! ```text
//! <state_dir>/
//! ├── STATE.yaml              # StateDocument (required)
//! ├── checkpoints.log         # append-only checkpoint log (required)
//! ├── HANDOFF.md              # handoff note (optional)
//! ├── config.toml             # store configuration (optional)
//! ├── agents.yaml             # agent registry (optional)
//! ├── skills.yaml             # skill catalog (optional)
//! ├── checksums.json          # checksum manifest (optional)
//! ├── .transaction.json       # journal, only while a transaction is open
//! └── checkpoints/snapshots/<id>/
//!     ├── ...copies...
//!     └── manifest.json
//! ```

use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "STATE.yaml";
pub const LOG_FILE: &str = "checkpoints.log";
pub const HANDOFF_FILE: &str = "HANDOFF.md";
pub const CONFIG_FILE: &str = "config.toml";
pub const AGENT_REGISTRY_FILE: &str = "agents.yaml";
pub const SKILL_REGISTRY_FILE: &str = "skills.yaml";
pub const MANIFEST_FILE: &str = "checksums.json";
pub const JOURNAL_FILE: &str = ".transaction.json";
pub const SNAPSHOT_MANIFEST_FILE: &str = "manifest.json";

/// Directory holding snapshots, relative to the state directory
pub const SNAPSHOTS_DIR: &str = "checkpoints/snapshots";

/// Files whose absence makes the state unrecoverable
pub const REQUIRED_FILES: &[&str] = &[STATE_FILE, LOG_FILE];

/// Files that improve recovery when present
pub const OPTIONAL_FILES: &[&str] = &[
    HANDOFF_FILE,
    CONFIG_FILE,
    AGENT_REGISTRY_FILE,
    SKILL_REGISTRY_FILE,
    MANIFEST_FILE,
];

/// Files covered by `checksums.json`, in hashing order
pub const PROTECTED_FILES: &[&str] = &[
    STATE_FILE,
    LOG_FILE,
    HANDOFF_FILE,
    CONFIG_FILE,
    AGENT_REGISTRY_FILE,
    SKILL_REGISTRY_FILE,
];

/// Prefix of in-flight temporary files created by the atomic writer
pub const TEMP_PREFIX: &str = ".agentd-tmp-";

/// Extension of transaction backup files
pub const BACKUP_EXTENSION: &str = "bak";

pub fn snapshots_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(SNAPSHOTS_DIR)
}

pub fn snapshot_dir(state_dir: &Path, checkpoint_id: &str) -> PathBuf {
    snapshots_dir(state_dir).join(checkpoint_id)
}

/// Files the crate creates transiently and never snapshots or hashes
pub fn is_transient(file_name: &str) -> bool {
    file_name == JOURNAL_FILE
        || file_name.starts_with(TEMP_PREFIX)
        || file_name.ends_with(&format!(".{}", BACKUP_EXTENSION))
}
