use agentd_state::cli::checksum::ChecksumCommands;
use agentd_state::cli::snapshot::SnapshotCommands;
use agentd_state::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentd-state")]
#[command(author = "Chris Cheng <chris.cheng@shopee.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Crash-safe workflow state: checkpoints, checksums, snapshots and recovery", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// State directory
    #[arg(long, global = true, default_value = ".agentd")]
    dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create STATE.yaml and the checkpoint log
    Init {
        /// Project name (defaults to the current directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Project type
        #[arg(short = 't', long = "type", default_value = "other")]
        project_type: String,
    },

    /// Show the current state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a checkpoint in the current phase
    Checkpoint {
        /// Checkpoint message (stored verbatim)
        message: String,

        /// Also snapshot the state at the new checkpoint
        #[arg(short, long)]
        snapshot: bool,
    },

    /// Move to a later phase
    Phase {
        /// Phase name
        phase: String,
    },

    /// Activate an agent, or set the current agent's status
    Agent {
        /// Agent name
        name: String,

        /// New status for the current agent (idle, active, paused, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Checksum manifest operations
    #[command(subcommand)]
    Checksum(ChecksumCommands),

    /// Snapshot operations
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Validate STATE.yaml
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score how completely the state can be recovered
    Score {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// One-line summary
        #[arg(long)]
        summary: bool,

        /// Minimum score for recovery (default from config.toml)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },

    /// Roll back interrupted work and check whether the state can resume
    Recover {
        /// Minimum score for recovery (default from config.toml)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agentd_state={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let dir = cli.dir;

    match cli.command {
        Commands::Init { name, project_type } => {
            let name = match name {
                Some(name) => name,
                None => std::env::current_dir()?
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("project")
                    .to_string(),
            };
            agentd_state::cli::init::run(&dir, &name, &project_type)?;
        }

        Commands::Status { json } => {
            agentd_state::cli::status::run(&dir, json)?;
        }

        Commands::Checkpoint { message, snapshot } => {
            agentd_state::cli::checkpoint::run(&dir, &message, snapshot)?;
        }

        Commands::Phase { phase } => {
            agentd_state::cli::phase::run(&dir, &phase)?;
        }

        Commands::Agent { name, status } => {
            agentd_state::cli::agent::run(&dir, &name, status.as_deref())?;
        }

        Commands::Checksum(cmd) => {
            agentd_state::cli::checksum::run(&dir, cmd)?;
        }

        Commands::Snapshot(cmd) => {
            agentd_state::cli::snapshot::run(&dir, cmd)?;
        }

        Commands::Validate { json } => {
            agentd_state::cli::validate::run(&dir, json)?;
        }

        Commands::Score {
            json,
            summary,
            threshold,
        } => {
            agentd_state::cli::score::run(&dir, json, summary, threshold)?;
        }

        Commands::Recover { threshold } => {
            agentd_state::cli::recover::run(&dir, threshold)?;
        }
    }

    Ok(())
}
