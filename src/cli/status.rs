use crate::integrity::{verify_checksums, IntegrityError};
use crate::models::{AgentStatus, Phase};
use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, json: bool) -> Result<()> {
    let store = StateStore::load(state_dir)?;
    let state = store.state();
    let last = store.log().last()?;

    let integrity = match verify_checksums(state_dir) {
        Ok(_) => "verified".to_string(),
        Err(e) if e.is_no_manifest() => "no manifest".to_string(),
        Err(IntegrityError::Tampered { summary, .. }) => format!("tampered ({})", summary),
        Err(e) => return Err(e.into()),
    };

    if json {
        let value = serde_json::json!({
            "project": state.project,
            "current_phase": state.current_phase,
            "current_checkpoint": state.current_checkpoint,
            "active_agent": state.active_agent,
            "last_updated": state.last_updated,
            "last_log_entry": last,
            "integrity": integrity,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", format!("Status for: {}", state.project.name).cyan().bold());
    println!();

    let phase_icon = match state.current_phase {
        Phase::Init => "🌱",
        Phase::Research => "🔍",
        Phase::Planning => "📝",
        Phase::Implementation => "🔨",
        Phase::Testing => "🧪",
        Phase::Review => "👀",
        Phase::Deployment => "🚀",
        Phase::Complete => "✅",
    };
    println!("   Phase:      {} {}", phase_icon, state.current_phase.to_string().yellow());
    println!("   Checkpoint: {}", state.current_checkpoint);

    match &state.active_agent.name {
        Some(name) => {
            let status = match state.active_agent.status {
                AgentStatus::Active => state.active_agent.status.as_str().green(),
                AgentStatus::Failed => state.active_agent.status.as_str().red(),
                _ => state.active_agent.status.as_str().normal(),
            };
            println!("   Agent:      {} ({})", name, status);
        }
        None => println!("   Agent:      {}", "none".bright_black()),
    }

    println!("   Updated:    {}", state.last_updated.format("%Y-%m-%d %H:%M:%S"));
    if let Some(entry) = last {
        println!("   Last log:   {} - {}", entry.checkpoint_id, entry.message);
    }

    let integrity = if integrity == "verified" {
        integrity.green()
    } else if integrity == "no manifest" {
        integrity.yellow()
    } else {
        integrity.red()
    };
    println!("   Integrity:  {}", integrity);

    Ok(())
}
