//! StateStore - typed STATE.yaml operations
//!
//! Every mutation follows the same path: clone the document, change the
//! clone, validate it, then write it inside one transaction together with
//! any log append and a refreshed `checksums.json`. The in-memory document
//! is replaced only after the transaction commits.

use super::log::CheckpointLog;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::integrity;
use crate::layout::{HANDOFF_FILE, STATE_FILE};
use crate::models::{
    AgentStatus, CheckpointId, CheckpointLogEntry, ChecksumManifest, Phase, ProgressStatus,
    ProjectInfo, StateDocument, CHECKPOINT_INIT,
};
use crate::storage::{has_interrupted, set_field, TransactionManager};
use crate::validator::{validate_agent_transition, validate_state_document, validate_state_yaml};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// State manager for one state directory
#[derive(Debug)]
pub struct StateStore {
    state_dir: PathBuf,
    state: StateDocument,
    config: StoreConfig,
}

impl StateStore {
    /// Create STATE.yaml and the checkpoint log in `state_dir`
    pub fn init(state_dir: impl Into<PathBuf>, project: ProjectInfo) -> Result<Self> {
        let state_dir = state_dir.into();
        let state_path = state_dir.join(STATE_FILE);
        if state_path.exists() {
            return Err(StoreError::AlreadyInitialized(state_dir).into());
        }
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;

        // Log entry first so last_updated is never older than the log
        let entry = CheckpointLogEntry::new(CHECKPOINT_INIT, "state initialized");
        let state = StateDocument::new(project);
        ensure_valid(&state_dir, &state)?;
        let config = StoreConfig::load(&state_dir)?;

        let mut tx = TransactionManager::new(&state_dir);
        tx.run("init", |tx| -> Result<()> {
            CheckpointLog::new(&state_dir).append(tx, &entry)?;
            write_state(tx, &state_dir, &state)?;
            integrity::store_checksums_with(&state_dir, tx)?;
            Ok(())
        })?;

        tracing::info!(dir = %state_dir.display(), project = %state.project.name, "state initialized");
        Ok(Self {
            state_dir,
            state,
            config,
        })
    }

    /// Load and validate STATE.yaml from `state_dir`
    pub fn load(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let state_dir = state_dir.into();
        if has_interrupted(&state_dir) {
            return Err(StoreError::Interrupted(state_dir).into());
        }

        let state_path = state_dir.join(STATE_FILE);
        if !state_path.exists() {
            return Err(StoreError::NotInitialized(state_dir).into());
        }

        let content = std::fs::read_to_string(&state_path)
            .with_context(|| format!("Failed to read {}", state_path.display()))?;

        let validation = validate_state_yaml(&content);
        if !validation.is_valid() {
            return Err(StoreError::InvalidState {
                path: state_path,
                summary: validation.format_issues(),
            }
            .into());
        }

        let state = StateDocument::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", state_path.display()))?;
        let config = StoreConfig::load(&state_dir)?;

        Ok(Self {
            state_dir,
            state,
            config,
        })
    }

    pub fn state(&self) -> &StateDocument {
        &self.state
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn log(&self) -> CheckpointLog {
        CheckpointLog::new(&self.state_dir)
    }

    /// Write the current document back (bumping `last_updated`)
    pub fn save(&mut self) -> Result<()> {
        let next = self.state.clone();
        self.commit_state("save", next)
    }

    // =========================================================================
    // Phase & agent
    // =========================================================================

    /// Move to `phase`; moving backwards is refused, staying is allowed
    pub fn set_phase(&mut self, phase: Phase) -> Result<()> {
        let current = self.state.current_phase;
        if phase < current {
            return Err(StoreError::PhaseRegression {
                current: current.to_string(),
                requested: phase.to_string(),
            }
            .into());
        }
        if phase == current {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.current_phase = phase;
        let left = next.phase_progress.entry(current).or_default();
        left.status = ProgressStatus::Completed;
        left.completion = 100;
        next.phase_progress.entry(phase).or_default().status = ProgressStatus::InProgress;

        self.commit_state("set-phase", next)?;
        tracing::info!(from = %current, to = %phase, "phase changed");
        Ok(())
    }

    /// Hand control to agent `name`
    ///
    /// Re-activating the current agent only resets its status to active.
    pub fn activate_agent(&mut self, name: &str) -> Result<()> {
        let from = self.state.active_agent.name.clone().unwrap_or_default();

        if from != name {
            let check = validate_agent_transition(&from, name);
            if !check.is_valid() {
                return Err(StoreError::Agent(check.format_issues()).into());
            }
        }

        let mut next = self.state.clone();
        next.active_agent.name = Some(name.to_string());
        next.active_agent.status = AgentStatus::Active;
        self.commit_state("activate-agent", next)?;

        tracing::info!(from = %from, to = name, "agent activated");
        Ok(())
    }

    /// Change the status of the current agent
    pub fn set_agent_status(&mut self, status: AgentStatus) -> Result<()> {
        let mut next = self.state.clone();
        next.active_agent.status = status;
        self.commit_state("agent-status", next)
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Record a checkpoint for the current phase
    ///
    /// Appends to the log, points the state at the new id and refreshes
    /// `checksums.json`, all in one transaction. `message` is stored verbatim.
    pub fn record_checkpoint(&mut self, message: &str) -> Result<CheckpointId> {
        let log = self.log();
        let id = log
            .next_id(self.state.current_phase)
            .with_context(|| format!("Failed to read {}", log.path().display()))?;
        let entry = CheckpointLogEntry::new(id.to_string(), message);

        let mut next = self.state.clone();
        next.current_checkpoint = id.to_string();
        next.touch();
        ensure_valid(&self.state_dir, &next)?;

        let state_dir = &self.state_dir;
        let mut tx = TransactionManager::new(state_dir);
        tx.run("checkpoint", |tx| -> Result<()> {
            log.append(tx, &entry)?;
            write_state(tx, state_dir, &next)?;
            integrity::store_checksums_with(state_dir, tx)?;
            Ok(())
        })?;

        self.state = next;
        tracing::info!(checkpoint = %id, "checkpoint recorded");
        Ok(id)
    }

    // =========================================================================
    // Fields & notes
    // =========================================================================

    /// Set one scalar field by dotted key (e.g. `project.version`)
    ///
    /// The value goes through the typed model, so a value of the wrong type
    /// or one that breaks a state rule is rejected and nothing is written.
    pub fn update_field(&mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Result<()> {
        let mut tree = serde_yaml::to_value(&self.state).context("Failed to serialize state")?;
        set_field(&mut tree, key, value.into())
            .map_err(|reason| anyhow::anyhow!("Cannot set '{}': {}", key, reason))?;
        let next: StateDocument = serde_yaml::from_value(tree)
            .with_context(|| format!("Invalid value for '{}'", key))?;

        self.commit_state("update-field", next)?;
        tracing::debug!(key, "state field updated");
        Ok(())
    }

    /// Replace HANDOFF.md
    pub fn write_handoff(&self, content: &str) -> Result<()> {
        let path = self.state_dir.join(HANDOFF_FILE);
        let state_dir = &self.state_dir;
        let mut tx = TransactionManager::new(state_dir);
        tx.run("handoff", |tx| -> Result<()> {
            tx.write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            integrity::store_checksums_with(state_dir, tx)?;
            Ok(())
        })
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    pub fn store_checksums(&self) -> Result<ChecksumManifest> {
        integrity::store_checksums(&self.state_dir).context("Failed to store checksums")
    }

    /// Snapshot the state directory at the current checkpoint
    ///
    /// Applies `snapshot_retention` afterwards.
    pub fn create_snapshot(&self) -> Result<PathBuf> {
        let id = &self.state.current_checkpoint;
        let path = integrity::create_snapshot(&self.state_dir, id)
            .with_context(|| format!("Failed to snapshot checkpoint {}", id))?;

        if let Some(keep) = self.config.snapshot_retention {
            let pruned = integrity::prune_snapshots(&self.state_dir, keep)?;
            if !pruned.is_empty() {
                tracing::info!(count = pruned.len(), keep, "old snapshots pruned");
            }
        }
        Ok(path)
    }

    /// Restore a verified snapshot and reload the state from it
    pub fn restore_snapshot(&mut self, checkpoint_id: &str) -> Result<Vec<String>> {
        let restored = integrity::restore_snapshot(&self.state_dir, checkpoint_id)
            .with_context(|| format!("Failed to restore snapshot {}", checkpoint_id))?;

        let reloaded = Self::load(&self.state_dir)?;
        self.state = reloaded.state;
        self.config = reloaded.config;
        Ok(restored)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn commit_state(&mut self, label: &str, mut next: StateDocument) -> Result<()> {
        next.touch();
        ensure_valid(&self.state_dir, &next)?;

        let state_dir = &self.state_dir;
        let mut tx = TransactionManager::new(state_dir);
        tx.run(label, |tx| -> Result<()> {
            write_state(tx, state_dir, &next)?;
            integrity::store_checksums_with(state_dir, tx)?;
            Ok(())
        })?;

        self.state = next;
        Ok(())
    }
}

fn ensure_valid(state_dir: &Path, state: &StateDocument) -> Result<()> {
    let validation = validate_state_document(state);
    if validation.is_valid() {
        return Ok(());
    }
    Err(StoreError::InvalidState {
        path: state_dir.join(STATE_FILE),
        summary: validation.format_issues(),
    }
    .into())
}

fn write_state(tx: &mut TransactionManager, state_dir: &Path, state: &StateDocument) -> Result<()> {
    let path = state_dir.join(STATE_FILE);
    let content = state.to_yaml().context("Failed to serialize STATE.yaml")?;
    tx.write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectType;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StateStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::init(
            temp_dir.path(),
            ProjectInfo::new("demo", ProjectType::Cli),
        )
        .unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_init_creates_required_files() {
        let (temp_dir, store) = setup();
        let dir = temp_dir.path();
        assert!(dir.join(STATE_FILE).exists());
        assert!(store.log().exists());
        assert!(dir.join(crate::layout::MANIFEST_FILE).exists());
        assert!(!has_interrupted(dir));
        assert_eq!(store.state().current_checkpoint, CHECKPOINT_INIT);
        assert!(integrity::verify_checksums(dir).is_ok());
    }

    #[test]
    fn test_init_twice_fails() {
        let (temp_dir, _store) = setup();
        let err = StateStore::init(temp_dir.path(), ProjectInfo::new("x", ProjectType::Api))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_load_round_trip() {
        let (temp_dir, mut store) = setup();
        store.set_phase(Phase::Research).unwrap();
        let loaded = StateStore::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.state(), store.state());
    }

    #[test]
    fn test_load_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        let err = StateStore::load(temp_dir.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_set_phase_forward_only() {
        let (_temp_dir, mut store) = setup();
        store.set_phase(Phase::Planning).unwrap();
        store.set_phase(Phase::Planning).unwrap();
        assert_eq!(store.state().phase_progress[&Phase::Init].completion, 100);
        assert_eq!(
            store.state().phase_progress[&Phase::Planning].status,
            ProgressStatus::InProgress
        );

        let err = store.set_phase(Phase::Research).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::PhaseRegression { .. })
        ));
        assert_eq!(store.state().current_phase, Phase::Planning);
    }

    #[test]
    fn test_agent_transitions() {
        let (_temp_dir, mut store) = setup();
        store.activate_agent("researcher").unwrap();
        store.activate_agent("planner").unwrap();
        store.activate_agent("planner").unwrap();
        assert!(store.activate_agent("deployer").is_err());
        assert_eq!(store.state().active_agent.name.as_deref(), Some("planner"));
        assert_eq!(store.state().active_agent.status, AgentStatus::Active);

        store.activate_agent("documenter").unwrap();
        store.set_agent_status(AgentStatus::Completed).unwrap();
        assert_eq!(store.state().active_agent.status, AgentStatus::Completed);
    }

    #[test]
    fn test_activate_without_agent_rejected_for_status() {
        let (temp_dir, mut store) = setup();
        let before = std::fs::read(temp_dir.path().join(STATE_FILE)).unwrap();
        assert!(store.set_agent_status(AgentStatus::Active).is_err());
        assert_eq!(std::fs::read(temp_dir.path().join(STATE_FILE)).unwrap(), before);
        assert_eq!(store.state().active_agent.status, AgentStatus::Idle);
    }

    #[test]
    fn test_record_checkpoint() {
        let (temp_dir, mut store) = setup();
        store.set_phase(Phase::Research).unwrap();

        let first = store.record_checkpoint("read the docs").unwrap();
        let second = store.record_checkpoint("wrote notes").unwrap();
        assert_eq!(first.to_string(), "CP_research_001");
        assert_eq!(second.to_string(), "CP_research_002");

        assert_eq!(store.state().current_checkpoint, "CP_research_002");
        assert!(store.log().contains("CP_research_002").unwrap());
        assert!(integrity::verify_checksums(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_checkpoint_message_stored_verbatim() {
        let (temp_dir, mut store) = setup();
        let message = "fix: a/b|c\\d & $(touch pwned) `id` \"q\" 'q'\nsecond line";
        store.record_checkpoint(message).unwrap();

        let last = store.log().last().unwrap().unwrap();
        assert_eq!(last.message, message);
        assert!(!temp_dir.path().join("pwned").exists());
        assert!(StateStore::load(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_update_field() {
        let (temp_dir, mut store) = setup();
        store.update_field("project.version", "2.0.0-rc1").unwrap();
        assert_eq!(store.state().project.version, "2.0.0-rc1");

        assert!(store.update_field("current_phase", "shipping").is_err());
        assert!(store.update_field("project.type", "spaceship").is_err());
        assert!(store.update_field("project", "flat").is_err());

        let loaded = StateStore::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.state().project.version, "2.0.0-rc1");
        assert_eq!(loaded.state().current_phase, Phase::Init);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let (temp_dir, mut store) = setup();
        store.set_phase(Phase::Research).unwrap();
        store.record_checkpoint("before").unwrap();
        store.create_snapshot().unwrap();

        store.record_checkpoint("after").unwrap();
        assert_eq!(store.state().current_checkpoint, "CP_research_002");

        store.restore_snapshot("CP_research_001").unwrap();
        assert_eq!(store.state().current_checkpoint, "CP_research_001");
        assert!(!store.log().contains("CP_research_002").unwrap());
        assert!(integrity::verify_checksums(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_snapshot_retention() {
        let (temp_dir, _) = setup();
        StoreConfig {
            snapshot_retention: Some(2),
            ..Default::default()
        }
        .save(temp_dir.path())
        .unwrap();
        let mut store = StateStore::load(temp_dir.path()).unwrap();
        assert_eq!(store.config().snapshot_retention, Some(2));

        store.set_phase(Phase::Research).unwrap();
        for i in 0..3 {
            store.record_checkpoint(&format!("step {i}")).unwrap();
            store.create_snapshot().unwrap();
        }
        let ids: Vec<_> = integrity::list_snapshots(temp_dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["CP_research_002", "CP_research_003"]);
    }
}
