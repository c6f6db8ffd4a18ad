use crate::models::{ProjectInfo, ProjectType};
use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, name: &str, project_type: &str) -> Result<()> {
    let Some(project_type) = ProjectType::parse(project_type) else {
        let known: Vec<&str> = ProjectType::ALL.iter().map(|t| t.as_str()).collect();
        anyhow::bail!(
            "Unknown project type '{}' (expected one of: {})",
            project_type,
            known.join(", ")
        );
    };

    let store = StateStore::init(state_dir, ProjectInfo::new(name, project_type))?;

    println!(
        "{}",
        format!("✅ Initialized state for '{}'", store.state().project.name).green()
    );
    println!("   Directory:  {}", state_dir.display());
    println!("   Checkpoint: {}", store.state().current_checkpoint);
    Ok(())
}
