//! Error types for the persistence layer
//!
//! Low-level primitives (atomic writer, checksum service) fail fast with a
//! typed error naming the implicated path. Orchestration code wraps these in
//! `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the atomic file writer
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create parent directory for {path}: {source}")]
    CreateParent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write temporary file for {path}: {source}")]
    TempWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {path}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("field '{key}' in {path}: {reason}")]
    Field {
        path: PathBuf,
        key: String,
        reason: String,
    },

    #[error("transaction: {0}")]
    Transaction(#[from] TransactionError),
}

/// Errors raised by the transaction manager
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction '{label}' ({id}) is already active")]
    AlreadyActive { id: String, label: String },

    #[error("no active transaction")]
    NotActive,

    #[error("failed to restore {path} from backup: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transaction journal {path}: {reason}")]
    Journal { path: PathBuf, reason: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the checksum/integrity service
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("file not found: {0}")]
    Missing(PathBuf),

    #[error("no checksum manifest at {0}")]
    NoManifest(PathBuf),

    #[error("failed to parse manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("integrity check failed in {dir}: {summary}")]
    Tampered {
        dir: PathBuf,
        summary: String,
        mismatched: Vec<String>,
        missing: Vec<String>,
        added: Vec<String>,
    },

    #[error("checksum mismatch for {path}: expected {expected}, found {actual}")]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("snapshot already exists: {0}")]
    SnapshotExists(String),

    #[error("invalid checkpoint id for snapshot: {0}")]
    InvalidSnapshotId(String),

    #[error("unsupported snapshot format version {found} (newest known: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write: {0}")]
    Write(#[from] WriteError),
}

impl From<TransactionError> for IntegrityError {
    fn from(e: TransactionError) -> Self {
        IntegrityError::Write(WriteError::Transaction(e))
    }
}

impl IntegrityError {
    /// Build a `Tampered` error from the three discrepancy lists
    pub fn tampered(
        dir: impl Into<PathBuf>,
        mismatched: Vec<String>,
        missing: Vec<String>,
        added: Vec<String>,
    ) -> Self {
        let mut parts = Vec::new();
        if !mismatched.is_empty() {
            parts.push(format!("modified: {}", mismatched.join(", ")));
        }
        if !missing.is_empty() {
            parts.push(format!("missing: {}", missing.join(", ")));
        }
        if !added.is_empty() {
            parts.push(format!("added: {}", added.join(", ")));
        }
        IntegrityError::Tampered {
            dir: dir.into(),
            summary: parts.join("; "),
            mismatched,
            missing,
            added,
        }
    }

    /// True when the error only means a manifest was never written
    pub fn is_no_manifest(&self) -> bool {
        matches!(self, IntegrityError::NoManifest(_))
    }
}

/// Rule violations raised by the state store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state directory {0} is not initialized (no STATE.yaml)")]
    NotInitialized(PathBuf),

    #[error("state directory {0} is already initialized")]
    AlreadyInitialized(PathBuf),

    #[error("invalid state in {path}:\n{summary}")]
    InvalidState { path: PathBuf, summary: String },

    #[error("cannot move from phase '{current}' back to '{requested}'")]
    PhaseRegression { current: String, requested: String },

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("agent change rejected:\n{0}")]
    Agent(String),

    #[error("an interrupted transaction is pending in {0}; run recovery first")]
    Interrupted(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tampered_summary_names_files() {
        let err = IntegrityError::tampered(
            "/tmp/state",
            vec!["STATE.yaml".to_string()],
            vec!["checkpoints.log".to_string()],
            vec![],
        );
        let msg = err.to_string();
        assert!(msg.contains("modified: STATE.yaml"));
        assert!(msg.contains("missing: checkpoints.log"));
        assert!(!msg.contains("added"));
        assert!(!err.is_no_manifest());
    }

    #[test]
    fn test_no_manifest_is_distinct() {
        let err = IntegrityError::NoManifest(PathBuf::from("checksums.json"));
        assert!(err.is_no_manifest());
    }
}
