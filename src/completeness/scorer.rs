//! Presence, field and consistency checks behind the completeness score

use crate::layout::{OPTIONAL_FILES, REQUIRED_FILES, STATE_FILE};
use crate::models::{
    CheckpointId, ConsistencyCheck, OptionalFilesCheck, Phase, RequiredFilesCheck,
    CHECKPOINT_INIT,
};
use crate::state::CheckpointLog;
use crate::validator::is_null_sentinel;
use chrono::{DateTime, Utc};
use serde_yaml::Value;
use std::path::Path;

/// Points per required file present (two files, 70 total)
pub const REQUIRED_FILE_POINTS: u8 = 35;

/// Points per optional file present (five files, 30 total)
pub const OPTIONAL_FILE_POINTS: u8 = 6;

/// Top-level STATE.yaml fields counted by the state score
pub const REQUIRED_STATE_FIELDS: &[&str] = &[
    "schema_version",
    "current_phase",
    "current_checkpoint",
    "project",
    "last_updated",
];

/// Points per required state field present
pub const STATE_FIELD_POINTS: u8 = 20;

pub fn check_required_files(dir: &Path) -> RequiredFilesCheck {
    let (present, missing) = partition_present(dir, REQUIRED_FILES);
    RequiredFilesCheck { present, missing }
}

pub fn check_optional_files(dir: &Path) -> OptionalFilesCheck {
    let (present, absent) = partition_present(dir, OPTIONAL_FILES);
    OptionalFilesCheck { present, absent }
}

fn partition_present(dir: &Path, names: &[&str]) -> (Vec<String>, Vec<String>) {
    let (present, absent): (Vec<&str>, Vec<&str>) =
        names.iter().copied().partition(|name| dir.join(name).is_file());
    (
        present.into_iter().map(String::from).collect(),
        absent.into_iter().map(String::from).collect(),
    )
}

/// 0-100 score for file presence
pub fn calculate_file_score(dir: &Path) -> u8 {
    let required = check_required_files(dir).present.len() as u32;
    let optional = check_optional_files(dir).present_count() as u32;
    let score = required * REQUIRED_FILE_POINTS as u32 + optional * OPTIONAL_FILE_POINTS as u32;
    score.min(100) as u8
}

fn read_state_tree(state_path: &Path) -> Option<Value> {
    let content = std::fs::read_to_string(state_path).ok()?;
    match serde_yaml::from_str::<Value>(&content) {
        Ok(tree @ Value::Mapping(_)) => Some(tree),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %state_path.display(), error = %e, "state document unparseable");
            None
        }
    }
}

fn field_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !is_null_sentinel(s),
        Some(_) => true,
    }
}

/// Required state fields that are absent or null
///
/// All of them when the document is missing or unparseable.
pub fn missing_state_fields(state_path: &Path) -> Vec<String> {
    let tree = read_state_tree(state_path);
    REQUIRED_STATE_FIELDS
        .iter()
        .filter(|field| !field_present(tree.as_ref().and_then(|t| t.get(**field))))
        .map(|field| field.to_string())
        .collect()
}

/// 0-100 score for required fields present in the state document at `state_path`
pub fn calculate_state_score(state_path: &Path) -> u8 {
    let present = REQUIRED_STATE_FIELDS.len() - missing_state_fields(state_path).len();
    (present as u32 * STATE_FIELD_POINTS as u32).min(100) as u8
}

/// Rounded mean of two 0-100 scores
pub fn composite(file_score: u8, state_score: u8) -> u8 {
    ((file_score as u16 + state_score as u16 + 1) / 2) as u8
}

/// Composite of file and state scores for `dir`
pub fn calculate_completeness_score(dir: &Path) -> u8 {
    composite(
        calculate_file_score(dir),
        calculate_state_score(&dir.join(STATE_FILE)),
    )
}

/// Cross-check STATE.yaml against the checkpoint log
///
/// Every finding is a warning; none of them changes the score.
pub fn check_state_consistency(dir: &Path) -> ConsistencyCheck {
    let mut warnings = Vec::new();

    let Some(tree) = read_state_tree(&dir.join(STATE_FILE)) else {
        return ConsistencyCheck {
            consistent: false,
            warnings: vec![format!("{} is missing or unreadable", STATE_FILE)],
        };
    };

    let log = CheckpointLog::new(dir);
    let entries = match log.entries() {
        Ok(entries) => entries,
        Err(e) => {
            warnings.push(format!("checkpoint log unreadable: {}", e));
            Vec::new()
        }
    };

    let checkpoint = tree.get("current_checkpoint").and_then(Value::as_str);
    if let Some(checkpoint) = checkpoint.filter(|c| *c != CHECKPOINT_INIT) {
        if !entries.iter().any(|e| e.checkpoint_id == checkpoint) {
            warnings.push(format!(
                "current_checkpoint {} does not appear in the checkpoint log",
                checkpoint
            ));
        }
    }

    let phase = tree.get("current_phase").and_then(Value::as_str).and_then(Phase::parse);
    let checkpoint_phase = checkpoint
        .and_then(CheckpointId::parse)
        .and_then(|id| id.phase());
    if let (Some(phase), Some(checkpoint_phase)) = (phase, checkpoint_phase) {
        if phase != checkpoint_phase {
            warnings.push(format!(
                "current_checkpoint belongs to phase {} but current_phase is {}",
                checkpoint_phase, phase
            ));
        }
    }

    let last_updated = tree
        .get("last_updated")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    let newest = entries.iter().map(|e| e.timestamp).max();
    if let (Some(last_updated), Some(newest)) = (last_updated, newest) {
        if last_updated < newest {
            warnings.push(format!(
                "last_updated ({}) is older than the newest log entry ({})",
                last_updated.to_rfc3339(),
                newest.to_rfc3339()
            ));
        }
    }

    for warning in &warnings {
        tracing::warn!(dir = %dir.display(), "{}", warning);
    }

    ConsistencyCheck {
        consistent: warnings.is_empty(),
        warnings,
    }
}
