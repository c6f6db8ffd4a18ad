use crate::models::AgentStatus;
use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, name: &str, status: Option<&str>) -> Result<()> {
    let mut store = StateStore::load(state_dir)?;

    match status {
        None => {
            store.activate_agent(name)?;
            println!("{}", format!("✅ Agent {} is active", name).green());
        }
        Some(status) => {
            let Some(status) = AgentStatus::ALL.iter().copied().find(|s| s.as_str() == status)
            else {
                anyhow::bail!("Unknown agent status '{}'", status);
            };
            if store.state().active_agent.name.as_deref() != Some(name) {
                anyhow::bail!("Agent '{}' is not the current agent", name);
            }
            store.set_agent_status(status)?;
            println!("{}", format!("✅ Agent {} is {}", name, status.as_str()).green());
        }
    }
    Ok(())
}
