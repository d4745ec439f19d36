//! backlog: planning-artifact change detection CLI.
//!
//! # Usage
//!
//! ```text
//! backlog parse  [--config FILE] [--epics FILE] [--stories-dir DIR] [--sprint-status FILE] [--output FILE]
//! backlog plan   [SOURCES] [--state FILE] [--output FILE]
//! backlog status [SOURCES] [--state FILE] [--all] [--json]
//! backlog commit --plan FILE --results FILE [--config FILE] [--state FILE]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{commit::CommitArgs, parse::ParseArgs, plan::PlanArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "backlog",
    version,
    about = "Detect which epics, stories and tasks changed since the last sync",
    long_about = None,
)]
struct Cli {
    /// Increase log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse planning artifacts and print the entity graph as JSON.
    Parse(ParseArgs),

    /// Classify every item against the sync state and print the sync plan.
    Plan(PlanArgs),

    /// Show what changed since the last sync.
    Status(StatusArgs),

    /// Fold remote-sync results into the sync state.
    Commit(CommitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Parse(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Commit(args) => args.run(),
    }
}
