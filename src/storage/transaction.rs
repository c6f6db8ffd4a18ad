//! Backup-based transactions over several atomic writes
//!
//! State machine: `Idle → Active → {commit, rollback} → Idle`. Transactions
//! are flat. While active, the first write to each path makes a sibling
//! backup (or records that the path did not exist), and the list of backups
//! is mirrored to a journal file so a later run can roll back after a hard
//! kill. Rollback restores every recorded path in reverse order; commit
//! deletes the journal and then the backups.
//!
//! Removing the journal is the commit point. A crash after it leaves only
//! stray backups behind, never a journal that would undo committed work.
//! Rollback is idempotent: an entry whose backup is already gone was
//! restored by an earlier, interrupted rollback.
//!
//! A manager dropped while a transaction is still active rolls it back, which
//! covers early `?` returns and panics unwinding through the unit of work.
//!
//! One mutator per directory is assumed. No file locks are taken.

use super::atomic::{atomic_write, cleanup_temp_artifacts, safe_backup};
use crate::error::{TransactionError, WriteError};
use crate::layout::JOURNAL_FILE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Pre-image record of one touched path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub original: PathBuf,
    /// `None` when the path did not exist before the transaction
    pub backup: Option<PathBuf>,
}

/// Persisted view of the active transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Journal {
    id: String,
    label: String,
    started_at: DateTime<Utc>,
    backups: Vec<Backup>,
}

/// Current state of a [`TransactionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
}

/// Outcome of a rollback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackSummary {
    /// Transaction id, if one was active
    pub id: Option<String>,
    /// Paths restored from a backup
    pub restored: Vec<PathBuf>,
    /// Paths created during the transaction and removed again
    pub removed: Vec<PathBuf>,
    /// Temporary files cleaned up
    pub temp_files_removed: usize,
}

/// Coordinates backups for one state directory
pub struct TransactionManager {
    root: PathBuf,
    active: Option<Journal>,
}

impl TransactionManager {
    /// Create a manager for `root` (where the journal lives)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    pub fn state(&self) -> TransactionState {
        if self.active.is_some() {
            TransactionState::Active
        } else {
            TransactionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the active transaction
    pub fn id(&self) -> Option<&str> {
        self.active.as_ref().map(|j| j.id.as_str())
    }

    /// Backups recorded so far, in call order
    pub fn backups(&self) -> &[Backup] {
        self.active
            .as_ref()
            .map(|j| j.backups.as_slice())
            .unwrap_or(&[])
    }

    /// Start a transaction and return its id
    ///
    /// Fails if one is already active here, or if a journal left by an
    /// interrupted run is still on disk (run [`recover_interrupted`] first).
    pub fn begin(&mut self, label: &str) -> Result<String, TransactionError> {
        if let Some(journal) = &self.active {
            return Err(TransactionError::AlreadyActive {
                id: journal.id.clone(),
                label: journal.label.clone(),
            });
        }
        if let Some(stale) = read_journal(&self.journal_path())? {
            return Err(TransactionError::AlreadyActive {
                id: stale.id,
                label: stale.label,
            });
        }

        let journal = Journal {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            started_at: Utc::now(),
            backups: Vec::new(),
        };
        write_journal(&self.journal_path(), &journal)?;
        tracing::debug!(id = %journal.id, label, "transaction started");

        let id = journal.id.clone();
        self.active = Some(journal);
        Ok(id)
    }

    /// Record the pre-image of `path` if this transaction has not touched it yet
    ///
    /// No-op when idle.
    pub fn backup(&mut self, path: &Path) -> Result<(), WriteError> {
        let journal_path = self.journal_path();
        let Some(journal) = self.active.as_mut() else {
            return Ok(());
        };
        if journal.backups.iter().any(|b| b.original == path) {
            return Ok(());
        }

        let backup = safe_backup(path)?;
        journal.backups.push(Backup {
            original: path.to_path_buf(),
            backup,
        });
        write_journal(&journal_path, journal)?;
        Ok(())
    }

    /// Atomic write that backs up `path` first when a transaction is active
    pub fn write(&mut self, path: &Path, content: impl AsRef<[u8]>) -> Result<(), WriteError> {
        self.backup(path)?;
        atomic_write(path, content)
    }

    /// Atomic line append that backs up `path` first when a transaction is active
    pub fn append_line(&mut self, path: &Path, line: &str) -> Result<(), WriteError> {
        self.backup(path)?;
        super::atomic::atomic_append_line(path, line)
    }

    /// Delete `path` (after backing it up when a transaction is active)
    pub fn remove(&mut self, path: &Path) -> Result<(), WriteError> {
        self.backup(path)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WriteError::Rename {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Keep all writes and delete every backup
    pub fn commit(&mut self) -> Result<(), TransactionError> {
        let journal = self.active.take().ok_or(TransactionError::NotActive)?;

        if let Err(e) = remove_if_exists(&self.journal_path()) {
            self.active = Some(journal);
            return Err(e);
        }

        for backup in journal.backups.iter().filter_map(|b| b.backup.as_ref()) {
            if let Err(e) = remove_if_exists(backup) {
                tracing::warn!(backup = %backup.display(), error = %e, "stale backup left after commit");
            }
        }

        tracing::info!(
            id = %journal.id,
            label = %journal.label,
            files = journal.backups.len(),
            "transaction committed"
        );
        Ok(())
    }

    /// Restore every recorded path and return to idle
    ///
    /// Without an active transaction this still performs cleanup: a journal
    /// left on disk is replayed and stray temporary files are removed.
    pub fn rollback(&mut self, reason: &str) -> Result<RollbackSummary, TransactionError> {
        let journal = match self.active.take() {
            Some(journal) => Some(journal),
            None => read_journal(&self.journal_path())?,
        };

        let mut summary = match journal {
            Some(journal) => {
                tracing::warn!(id = %journal.id, label = %journal.label, reason, "rolling back transaction");
                let summary = restore_all(&journal)?;
                remove_if_exists(&self.journal_path())?;
                summary
            }
            None => {
                tracing::debug!(reason, "rollback requested with no active transaction");
                RollbackSummary::default()
            }
        };

        summary.temp_files_removed += cleanup_temp_artifacts(&self.root)?;
        Ok(summary)
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`
    pub fn run<T, E, F>(&mut self, label: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<TransactionError> + std::fmt::Display,
    {
        self.begin(label)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = self.rollback(&e.to_string()) {
                    tracing::error!(label, error = %rb, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

impl Drop for TransactionManager {
    fn drop(&mut self) {
        if self.active.is_some() {
            let reason = if std::thread::panicking() {
                "panic during transaction"
            } else {
                "transaction dropped without commit"
            };
            if let Err(e) = self.rollback(reason) {
                tracing::error!(error = %e, "automatic rollback failed");
            }
        }
    }
}

/// Roll back a transaction left behind by a process that died mid-way
///
/// Returns `None` when no journal exists.
pub fn recover_interrupted(root: &Path) -> Result<Option<RollbackSummary>, TransactionError> {
    let journal_path = root.join(JOURNAL_FILE);
    let Some(journal) = read_journal(&journal_path)? else {
        return Ok(None);
    };

    tracing::warn!(id = %journal.id, label = %journal.label, "recovering interrupted transaction");
    let mut summary = restore_all(&journal)?;
    remove_if_exists(&journal_path)?;
    summary.temp_files_removed += cleanup_temp_artifacts(root)?;
    Ok(Some(summary))
}

/// Whether a journal from an unfinished transaction exists under `root`
pub fn has_interrupted(root: &Path) -> bool {
    root.join(JOURNAL_FILE).exists()
}

fn restore_all(journal: &Journal) -> Result<RollbackSummary, TransactionError> {
    let mut summary = RollbackSummary {
        id: Some(journal.id.clone()),
        ..Default::default()
    };
    let mut first_error = None;
    let mut dirs = BTreeSet::new();

    for entry in journal.backups.iter().rev() {
        if let Some(parent) = entry.original.parent() {
            dirs.insert(parent.to_path_buf());
        }

        let result = match &entry.backup {
            Some(backup) => match fs::rename(backup, &entry.original) {
                Ok(()) => {
                    summary.restored.push(entry.original.clone());
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %entry.original.display(), "backup already restored");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            None => match fs::remove_file(&entry.original) {
                Ok(()) => {
                    summary.removed.push(entry.original.clone());
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            },
        };

        if let Err(source) = result {
            tracing::error!(path = %entry.original.display(), error = %source, "restore failed");
            if first_error.is_none() {
                first_error = Some(TransactionError::Restore {
                    path: entry.original.clone(),
                    source,
                });
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    for dir in dirs {
        summary.temp_files_removed += cleanup_temp_artifacts(&dir)?;
    }

    Ok(summary)
}

fn read_journal(path: &Path) -> Result<Option<Journal>, TransactionError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| TransactionError::Journal {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn write_journal(path: &Path, journal: &Journal) -> Result<(), TransactionError> {
    let content = serde_json::to_string_pretty(journal).map_err(|e| TransactionError::Journal {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    atomic_write(path, content).map_err(|e| TransactionError::Journal {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn remove_if_exists(path: &Path) -> Result<(), TransactionError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
