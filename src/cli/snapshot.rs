use crate::integrity::{
    self, list_snapshots, prune_snapshots, verify_snapshot_manifest, SnapshotStatus,
};
use crate::layout;
use crate::state::StateStore;
use crate::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Snapshot the state directory (defaults to the current checkpoint)
    Create {
        /// Checkpoint id to file the snapshot under
        id: Option<String>,
    },

    /// Verify a snapshot against its manifest
    Verify {
        /// Checkpoint id of the snapshot
        id: String,
    },

    /// Restore the state directory from a verified snapshot
    Restore {
        /// Checkpoint id of the snapshot
        id: String,
    },

    /// List snapshots, oldest first
    List,

    /// Delete the oldest snapshots
    Prune {
        /// Number of snapshots to keep
        #[arg(short, long)]
        keep: usize,
    },
}

pub fn run(state_dir: &Path, cmd: SnapshotCommands) -> Result<()> {
    match cmd {
        SnapshotCommands::Create { id } => {
            let path = match id {
                Some(id) => integrity::create_snapshot(state_dir, &id)?,
                None => StateStore::load(state_dir)?.create_snapshot()?,
            };
            println!("{}", format!("✅ Snapshot created: {}", path.display()).green());
        }

        SnapshotCommands::Verify { id } => {
            match verify_snapshot_manifest(&layout::snapshot_dir(state_dir, &id))? {
                SnapshotStatus::Verified { file_count } => println!(
                    "{}",
                    format!("✅ Snapshot {} verified ({} files)", id, file_count).green()
                ),
                SnapshotStatus::Legacy => println!(
                    "{}",
                    format!("✅ Snapshot {} has no manifest (legacy format)", id).yellow()
                ),
            }
        }

        SnapshotCommands::Restore { id } => {
            let restored = integrity::restore_snapshot(state_dir, &id)?;
            println!(
                "{}",
                format!("✅ Restored {} files from snapshot {}", restored.len(), id).green()
            );
        }

        SnapshotCommands::List => {
            let snapshots = list_snapshots(state_dir)?;
            if snapshots.is_empty() {
                println!("{}", "No snapshots".bright_black());
            }
            for info in snapshots {
                let files = info
                    .file_count
                    .map(|n| format!("{} files", n))
                    .unwrap_or_else(|| "legacy".to_string());
                println!(
                    "   {:<28} {}  {}",
                    info.id.cyan(),
                    info.created_at.format("%Y-%m-%d %H:%M:%S"),
                    files
                );
            }
        }

        SnapshotCommands::Prune { keep } => {
            let removed = prune_snapshots(state_dir, keep)?;
            println!("{}", format!("✅ Pruned {} snapshots", removed.len()).green());
            for id in removed {
                println!("   - {}", id);
            }
        }
    }
    Ok(())
}
