use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, message: &str, snapshot: bool) -> Result<()> {
    let mut store = StateStore::load(state_dir)?;
    let id = store.record_checkpoint(message)?;
    println!("{}", format!("✅ Checkpoint {} recorded", id).green());

    if snapshot {
        let path = store.create_snapshot()?;
        println!("   Snapshot: {}", path.display());
    }
    Ok(())
}
