//! Crash-safe file mutation
//!
//! - `atomic`: single-file replace/append via temp file + rename
//! - `transaction`: multi-file units of work with backup-based rollback
//! - `field`: typed single-field updates of YAML documents

pub mod atomic;
pub mod field;
pub mod transaction;

pub use atomic::{
    atomic_append, atomic_append_line, atomic_write, cleanup_temp_artifacts, safe_backup,
    stage_write, StagedWrite,
};
pub use field::{get_field, set_field, update_field};
pub use transaction::{
    has_interrupted, recover_interrupted, Backup, RollbackSummary, TransactionManager,
    TransactionState,
};
