//! StateDocument - the authoritative STATE.yaml record
//!
//! The typed model is the only way the crate touches state fields. Raw YAML is
//! parsed once at the boundary (`StateDocument::from_yaml`) and written back
//! whole (`to_yaml`), so no value is ever spliced into document text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Schema version written by this crate
pub const SCHEMA_VERSION: &str = "1.0";

/// Sentinel checkpoint id used before the first real checkpoint
pub const CHECKPOINT_INIT: &str = "CP_INIT";

// =============================================================================
// Phase
// =============================================================================

/// Workflow phase (fixed, ordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Research,
    Planning,
    Implementation,
    Testing,
    Review,
    Deployment,
    Complete,
}

impl Phase {
    /// All phases in workflow order
    pub const ALL: [Phase; 8] = [
        Phase::Init,
        Phase::Research,
        Phase::Planning,
        Phase::Implementation,
        Phase::Testing,
        Phase::Review,
        Phase::Deployment,
        Phase::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Research => "research",
            Phase::Planning => "planning",
            Phase::Implementation => "implementation",
            Phase::Testing => "testing",
            Phase::Review => "review",
            Phase::Deployment => "deployment",
            Phase::Complete => "complete",
        }
    }

    /// Parse a phase id (case-sensitive, as stored)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Position in the workflow order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Project
// =============================================================================

/// Project type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    WebApp,
    Api,
    Cli,
    Library,
    MobileApp,
    DataPipeline,
    Infrastructure,
    Other,
}

impl ProjectType {
    pub const ALL: [ProjectType; 8] = [
        ProjectType::WebApp,
        ProjectType::Api,
        ProjectType::Cli,
        ProjectType::Library,
        ProjectType::MobileApp,
        ProjectType::DataPipeline,
        ProjectType::Infrastructure,
        ProjectType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::WebApp => "web-app",
            ProjectType::Api => "api",
            ProjectType::Cli => "cli",
            ProjectType::Library => "library",
            ProjectType::MobileApp => "mobile-app",
            ProjectType::DataPipeline => "data-pipeline",
            ProjectType::Infrastructure => "infrastructure",
            ProjectType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

/// Project metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,

    #[serde(rename = "type")]
    pub project_type: ProjectType,

    #[serde(default = "default_project_version")]
    pub version: String,
}

fn default_project_version() -> String {
    "0.1.0".to_string()
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            name: name.into(),
            project_type,
            version: default_project_version(),
        }
    }
}

// =============================================================================
// Active agent
// =============================================================================

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Active,
    Paused,
    Completed,
    Failed,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 5] = [
        AgentStatus::Idle,
        AgentStatus::Active,
        AgentStatus::Paused,
        AgentStatus::Completed,
        AgentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Active => "active",
            AgentStatus::Paused => "paused",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
        }
    }
}

/// Descriptor of the currently active agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveAgent {
    /// Agent name; `None` when no agent has been activated yet
    pub name: Option<String>,

    #[serde(default)]
    pub status: AgentStatus,
}

// =============================================================================
// Progress & health
// =============================================================================

/// Progress status of a single phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

/// Per-phase progress entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgress {
    #[serde(default)]
    pub status: ProgressStatus,

    /// Completion percentage (0-100)
    #[serde(default)]
    pub completion: u8,
}

/// Overall health status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Critical,
}

/// Health descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: HealthStatus,

    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
}

// =============================================================================
// StateDocument
// =============================================================================

/// STATE.yaml contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub schema_version: String,

    pub current_phase: Phase,

    pub current_checkpoint: String,

    pub project: ProjectInfo,

    #[serde(default)]
    pub active_agent: ActiveAgent,

    /// Enabled capabilities (skills, integrations)
    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub phase_progress: BTreeMap<Phase, PhaseProgress>,

    #[serde(default)]
    pub health: Health,

    pub last_updated: DateTime<Utc>,
}

impl StateDocument {
    /// Fresh document for a newly initialized project
    pub fn new(project: ProjectInfo) -> Self {
        let mut phase_progress = BTreeMap::new();
        for phase in Phase::ALL {
            phase_progress.insert(phase, PhaseProgress::default());
        }

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            current_phase: Phase::Init,
            current_checkpoint: CHECKPOINT_INIT.to_string(),
            project,
            active_agent: ActiveAgent::default(),
            capabilities: Vec::new(),
            phase_progress,
            health: Health::default(),
            last_updated: Utc::now(),
        }
    }

    /// Parse a document from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize the whole document to YAML text
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Bump `last_updated` to now
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
