//! `backlog commit`: write the next sync-state snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use backlog_sync::{plan::load_plan_at, writeback};
use chrono::Utc;
use clap::Args;

use super::sources::ConfigArgs;

/// Arguments for `backlog commit`.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Plan written by `backlog plan --output`.
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,

    /// Results JSON reported by the remote-sync step.
    #[arg(long, value_name = "FILE")]
    pub results: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl CommitArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let plan = load_plan_at(&self.plan)
            .with_context(|| format!("failed to read plan {}", self.plan.display()))?;
        let results = writeback::load_results_at(&self.results)
            .with_context(|| format!("failed to read results {}", self.results.display()))?;

        let counts = writeback::commit(&plan, &results, &config, Utc::now())
            .context("failed to write sync state")?;

        eprintln!("✓ sync state written to {}", config.state.display());
        eprintln!(
            "  epics: {}, stories: {} ({} pending), tasks: {} ({} pending), iterations: {}",
            counts.epics,
            counts.stories,
            counts.pending_stories,
            counts.tasks,
            counts.pending_tasks,
            counts.iterations
        );
        println!(
            "{}",
            serde_json::to_string(&counts).context("failed to serialize counts")?
        );
        Ok(())
    }
}
