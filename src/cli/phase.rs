use crate::error::StoreError;
use crate::models::Phase;
use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, phase: &str) -> Result<()> {
    let phase = Phase::parse(phase).ok_or_else(|| StoreError::UnknownPhase(phase.to_string()))?;

    let mut store = StateStore::load(state_dir)?;
    let previous = store.state().current_phase;
    store.set_phase(phase)?;

    if previous == phase {
        println!("{}", format!("Already in phase {}", phase).yellow());
    } else {
        println!("{}", format!("✅ Phase {} → {}", previous, phase).green());
    }
    Ok(())
}
