pub mod checkpoint;
pub mod completeness;
pub mod manifest;
pub mod state;
pub mod validation;

pub use checkpoint::{CheckpointId, CheckpointLogEntry, CheckpointMetadata};
pub use completeness::{CompletenessReport, ConsistencyCheck, OptionalFilesCheck, RequiredFilesCheck};
pub use manifest::{ChecksumManifest, SnapshotManifest, HASH_ALGORITHM, SNAPSHOT_FORMAT_VERSION};
pub use state::{
    ActiveAgent, AgentStatus, Health, HealthStatus, Phase, PhaseProgress, ProgressStatus,
    ProjectInfo, ProjectType, StateDocument, CHECKPOINT_INIT, SCHEMA_VERSION,
};
pub use validation::{IssueCategory, Severity, ValidationIssue, ValidationResult};
