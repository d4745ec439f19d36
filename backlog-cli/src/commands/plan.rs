//! `backlog plan`: build the sync plan.

use std::path::PathBuf;

use anyhow::{Context, Result};
use backlog_sync::{pipeline, plan::save_plan_at};
use clap::Args;

use super::sources::{emit_json, SourceArgs};

/// Arguments for `backlog plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Write the plan here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.sources.resolve()?;
        let plan = pipeline::run(&config).context("planning failed")?;

        for warning in &plan.warnings {
            tracing::warn!("{warning}");
        }

        match &self.output {
            Some(path) => {
                save_plan_at(path, &plan)
                    .with_context(|| format!("failed to write plan {}", path.display()))?;
                let s = &plan.summary;
                println!(
                    "✓ plan written to {} ({} epics, {} stories, {} tasks to sync; {} iterations; ~{} remote calls)",
                    path.display(),
                    s.epics.pending_work(),
                    s.stories.pending_work(),
                    s.tasks.pending_work(),
                    plan.iterations.len(),
                    s.estimated_remote_calls
                );
            }
            None => {
                let json =
                    serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
                emit_json(&json, None)?;
            }
        }
        Ok(())
    }
}
