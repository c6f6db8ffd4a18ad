//! Checkpoint identifiers and log entries

use super::state::{Phase, CHECKPOINT_INIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed checkpoint id: `CP_<phase>_<sequence>` or the `CP_INIT` sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointId {
    Init,
    Phase { phase: Phase, sequence: u32 },
}

impl CheckpointId {
    /// Parse a checkpoint id string. Returns `None` if it does not match the grammar.
    pub fn parse(s: &str) -> Option<Self> {
        if s == CHECKPOINT_INIT {
            return Some(CheckpointId::Init);
        }

        let rest = s.strip_prefix("CP_")?;
        let (phase, sequence) = rest.rsplit_once('_')?;
        let phase = Phase::parse(phase)?;
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let sequence = sequence.parse().ok()?;

        Some(CheckpointId::Phase { phase, sequence })
    }

    /// Phase encoded in the id (`None` for the sentinel)
    pub fn phase(&self) -> Option<Phase> {
        match self {
            CheckpointId::Init => None,
            CheckpointId::Phase { phase, .. } => Some(*phase),
        }
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointId::Init => f.write_str(CHECKPOINT_INIT),
            CheckpointId::Phase { phase, sequence } => write!(f, "CP_{}_{:03}", phase, sequence),
        }
    }
}

/// One line of the append-only checkpoint log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointLogEntry {
    pub timestamp: DateTime<Utc>,
    pub checkpoint_id: String,
    pub message: String,
}

impl CheckpointLogEntry {
    pub fn new(checkpoint_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            checkpoint_id: checkpoint_id.into(),
            message: message.into(),
        }
    }

    /// Encode as a single log line (no trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Checkpoint metadata as recorded alongside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,

    /// Revision the checkpoint was taken at (short or full hex hash)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
