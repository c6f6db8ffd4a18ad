use crate::integrity::{store_checksums, verify_checksums, IntegrityError};
use crate::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

#[derive(Subcommand)]
pub enum ChecksumCommands {
    /// Compute and write checksums.json
    Store,

    /// Compare the state files against checksums.json
    Verify,
}

pub fn run(state_dir: &Path, cmd: ChecksumCommands) -> Result<()> {
    match cmd {
        ChecksumCommands::Store => {
            let manifest = store_checksums(state_dir)?;
            println!(
                "{}",
                format!("✅ Stored checksums for {} files", manifest.files.len()).green()
            );
            println!("   Combined: {}", manifest.combined_hash);
        }

        ChecksumCommands::Verify => match verify_checksums(state_dir) {
            Ok(report) => {
                println!(
                    "{}",
                    format!("✅ {} files verified", report.verified.len()).green()
                );
                println!("   Combined: {}", report.combined_hash);
            }
            Err(IntegrityError::NoManifest(path)) => {
                println!("{}", "⚠️  No checksum manifest yet".yellow());
                println!("   Run 'checksum store' to create {}", path.display());
                anyhow::bail!("no checksum manifest");
            }
            Err(e) => {
                if let IntegrityError::Tampered {
                    mismatched,
                    missing,
                    added,
                    ..
                } = &e
                {
                    for file in mismatched {
                        println!("   {} {}", "modified:".red(), file);
                    }
                    for file in missing {
                        println!("   {} {}", "missing: ".red(), file);
                    }
                    for file in added {
                        println!("   {} {}", "added:   ".yellow(), file);
                    }
                }
                return Err(e.into());
            }
        },
    }
    Ok(())
}
