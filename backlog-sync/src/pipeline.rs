//! Shared planning entrypoint used by the CLI commands.

use backlog_core::{state, ProjectConfig};
use backlog_parser::{load_project, Sources};
use tracing::info;

use crate::plan::{build_plan, SyncPlan};
use crate::SyncError;

/// Parse the configured artifacts, load the prior snapshot and build a plan.
///
/// Nothing is written; the snapshot at `config.state` is only read.
pub fn run(config: &ProjectConfig) -> Result<SyncPlan, SyncError> {
    let sources = Sources::from_config(config)?;
    let parsed = load_project(&sources)?;
    let prior = state::load_at(&config.state)?;
    if prior.is_empty() {
        info!("no prior sync state at {}; everything is new", config.state.display());
    }
    let plan = build_plan(parsed, &prior);
    info!(
        "plan: {} epics, {} stories, {} tasks to create or update; {} iterations",
        plan.summary.epics.pending_work(),
        plan.summary.stories.pending_work(),
        plan.summary.tasks.pending_work(),
        plan.iterations.len()
    );
    Ok(plan)
}
