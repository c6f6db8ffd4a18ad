use crate::completeness::{configured_threshold, format_report, generate_completeness_report};
use crate::integrity::verify_checksums;
use crate::storage::{cleanup_temp_artifacts, recover_interrupted};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Bring a state directory back to a resumable state after an interruption
///
/// Rolls back a transaction left by a killed process, removes stray
/// temporary files, checks integrity and scores completeness. Fails when the
/// score stays below the threshold.
pub fn run(state_dir: &Path, threshold: Option<u8>) -> Result<()> {
    println!("{}", "🔧 Recovering state...".cyan());

    match recover_interrupted(state_dir)? {
        Some(summary) => println!(
            "   Rolled back interrupted transaction: {} restored, {} removed",
            summary.restored.len(),
            summary.removed.len()
        ),
        None => println!("   No interrupted transaction"),
    }

    let removed = cleanup_temp_artifacts(state_dir)?;
    if removed > 0 {
        println!("   Removed {} temporary files", removed);
    }

    match verify_checksums(state_dir) {
        Ok(report) => println!("   Checksums: {} files verified", report.verified.len()),
        Err(e) if e.is_no_manifest() => println!("   Checksums: {}", "no manifest".yellow()),
        Err(e) => println!("   Checksums: {}", e.to_string().red()),
    }

    let threshold = threshold.unwrap_or_else(|| configured_threshold(state_dir));
    let report = generate_completeness_report(state_dir, threshold);
    println!();
    print!("{}", format_report(&report));

    if !report.is_complete {
        anyhow::bail!(
            "completeness {} is below threshold {}; reconcile the state manually",
            report.score,
            threshold
        );
    }
    println!("{}", "✅ Ready to resume".green());
    Ok(())
}
