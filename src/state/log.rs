//! CheckpointLog - append-only checkpoint history (`checkpoints.log`)

use crate::error::WriteError;
use crate::layout::LOG_FILE;
use crate::models::{CheckpointId, CheckpointLogEntry, Phase};
use crate::storage::TransactionManager;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reader/appender for one state directory's log
pub struct CheckpointLog {
    path: PathBuf,
}

impl CheckpointLog {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append an entry through `tx` (backed up when a transaction is open)
    pub fn append(
        &self,
        tx: &mut TransactionManager,
        entry: &CheckpointLogEntry,
    ) -> Result<(), WriteError> {
        let line = entry.to_line().map_err(|e| WriteError::Field {
            path: self.path.clone(),
            key: "checkpoint_id".to_string(),
            reason: e.to_string(),
        })?;
        tx.append_line(&self.path, &line)?;
        tracing::debug!(checkpoint = %entry.checkpoint_id, "checkpoint logged");
        Ok(())
    }

    /// All well-formed entries in file order
    ///
    /// A missing log reads as empty. Malformed lines are skipped with a warning.
    pub fn entries(&self) -> io::Result<Vec<CheckpointLogEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match CheckpointLogEntry::from_line(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    log = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping malformed checkpoint log line"
                ),
            }
        }
        Ok(entries)
    }

    pub fn contains(&self, checkpoint_id: &str) -> io::Result<bool> {
        Ok(self
            .entries()?
            .iter()
            .any(|e| e.checkpoint_id == checkpoint_id))
    }

    pub fn last(&self) -> io::Result<Option<CheckpointLogEntry>> {
        Ok(self.entries()?.pop())
    }

    /// Next free sequence number for `phase` (1 when the phase has none yet)
    pub fn next_sequence(&self, phase: Phase) -> io::Result<u32> {
        let highest = self
            .entries()?
            .iter()
            .filter_map(|e| CheckpointId::parse(&e.checkpoint_id))
            .filter_map(|id| match id {
                CheckpointId::Phase { phase: p, sequence } if p == phase => Some(sequence),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Ok(highest.saturating_add(1))
    }

    /// Id for the next checkpoint in `phase`
    pub fn next_id(&self, phase: Phase) -> io::Result<CheckpointId> {
        Ok(CheckpointId::Phase {
            phase,
            sequence: self.next_sequence(phase)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn append(log: &CheckpointLog, dir: &Path, id: &str, message: &str) {
        let mut tx = TransactionManager::new(dir);
        log.append(&mut tx, &CheckpointLogEntry::new(id, message)).unwrap();
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = CheckpointLog::new(temp_dir.path());
        assert!(log.entries().unwrap().is_empty());
        assert_eq!(log.last().unwrap(), None);
        assert_eq!(log.next_sequence(Phase::Research).unwrap(), 1);
    }

    #[test]
    fn test_append_and_query() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let log = CheckpointLog::new(dir);

        append(&log, dir, "CP_INIT", "initialized");
        append(&log, dir, "CP_research_001", "first findings");
        append(&log, dir, "CP_research_002", "more findings");
        append(&log, dir, "CP_planning_001", "plan drafted");

        assert_eq!(log.entries().unwrap().len(), 4);
        assert!(log.contains("CP_research_002").unwrap());
        assert!(!log.contains("CP_research_003").unwrap());
        assert_eq!(log.last().unwrap().unwrap().checkpoint_id, "CP_planning_001");
        assert_eq!(log.next_sequence(Phase::Research).unwrap(), 3);
        assert_eq!(log.next_id(Phase::Planning).unwrap().to_string(), "CP_planning_002");
        assert_eq!(log.next_id(Phase::Testing).unwrap().to_string(), "CP_testing_001");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let log = CheckpointLog::new(dir);
        append(&log, dir, "CP_research_001", "ok");
        fs::write(
            log.path(),
            format!("{}not json\n\n", fs::read_to_string(log.path()).unwrap()),
        )
        .unwrap();
        append(&log, dir, "CP_research_002", "still ok");

        let ids: Vec<_> = log
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.checkpoint_id)
            .collect();
        assert_eq!(ids, vec!["CP_research_001", "CP_research_002"]);
    }
}
