//! Recoverability report types

use serde::{Deserialize, Serialize};

/// Presence of the required state files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredFilesCheck {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl RequiredFilesCheck {
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Presence of the optional state files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionalFilesCheck {
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

impl OptionalFilesCheck {
    pub fn present_count(&self) -> usize {
        self.present.len()
    }
}

/// Cross-check of state against the checkpoint log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub consistent: bool,
    pub warnings: Vec<String>,
}

/// Full completeness report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub file_score: u8,
    pub state_score: u8,
    /// Composite 0-100 score
    pub score: u8,
    pub missing_files: Vec<String>,
    pub optional_present: Vec<String>,
    pub missing_fields: Vec<String>,
    pub consistent: bool,
    pub consistency_warnings: Vec<String>,
    pub threshold: u8,
    pub is_complete: bool,
}
