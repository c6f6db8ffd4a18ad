use crate::layout::STATE_FILE;
use crate::models::Severity;
use crate::validator::validate_state_file;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, json: bool) -> Result<()> {
    let result = validate_state_file(&state_dir.join(STATE_FILE));

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else if result.issues.is_empty() {
        println!("{}", format!("✅ {} is valid", STATE_FILE).green());
    } else {
        for issue in &result.issues {
            let line = issue.format();
            match issue.severity {
                Severity::Error => println!("{}", line.red()),
                Severity::Warning => println!("{}", line.yellow()),
            }
        }
        println!(
            "\n{} errors, {} warnings",
            result.count_by_severity(Severity::Error),
            result.count_by_severity(Severity::Warning)
        );
    }

    if !result.is_valid() {
        anyhow::bail!("{} failed validation", STATE_FILE);
    }
    Ok(())
}
