// Agentd State - crash-safe persistence for multi-session agent workflows
// Atomic writes, transactions, checksums, schema validation and recovery scoring

pub mod cli;
pub mod completeness;
pub mod config;
pub mod error;
pub mod integrity;
pub mod layout;
pub mod models;
pub mod state;
pub mod storage;
pub mod validator;

pub use anyhow::{Context, Result};

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{IntegrityError, StoreError, TransactionError, WriteError};
pub use models::{CompletenessReport, Phase, StateDocument, ValidationResult};
pub use state::{CheckpointLog, StateStore};
pub use storage::{atomic_write, TransactionManager};
