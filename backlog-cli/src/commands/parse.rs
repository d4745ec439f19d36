//! `backlog parse`: print the extracted entity graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use backlog_parser::{load_project, ParsedProject, ProjectCounts, Sources};
use clap::Args;
use serde::Serialize;

use super::sources::{emit_json, SourceArgs};

/// Arguments for `backlog parse`.
#[derive(Args, Debug)]
pub struct ParseArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Write the JSON here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    #[serde(flatten)]
    project: &'a ParsedProject,
    counts: ProjectCounts,
}

impl ParseArgs {
    pub fn run(self) -> Result<()> {
        let config = self.sources.resolve()?;
        let sources = Sources::from_config(&config)?;
        let project = load_project(&sources)
            .with_context(|| format!("failed to parse {}", sources.epics.display()))?;

        for warning in &project.warnings {
            tracing::warn!("{warning}");
        }

        let counts = project.counts();
        let json = serde_json::to_string_pretty(&ParseOutput {
            project: &project,
            counts,
        })
        .context("failed to serialize parse output")?;
        emit_json(&json, self.output.as_deref())?;

        if let Some(path) = &self.output {
            eprintln!(
                "✓ {} epics, {} stories, {} tasks ({} review follow-ups) → {}",
                counts.epics,
                counts.stories,
                counts.tasks,
                counts.review_followups,
                path.display()
            );
        }
        Ok(())
    }
}
