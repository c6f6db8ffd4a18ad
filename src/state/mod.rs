//! STATE.yaml Management Module
//!
//! - `StateStore`: typed document operations (phase, agent, checkpoints)
//! - `CheckpointLog`: the append-only `checkpoints.log`

mod log;
mod manager;

pub use log::CheckpointLog;
pub use manager::StateStore;
