//! `backlog status`: what changed since the last sync.

use anyhow::{Context, Result};
use backlog_sync::{
    pipeline, Classification, ClassCounts, Classified, IterationAction, PlanSummary, SyncPlan,
};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::sources::SourceArgs;

const TITLE_WIDTH: usize = 60;

/// Arguments for `backlog status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Also list unchanged items.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = self.sources.resolve()?;
        let plan = pipeline::run(&config).context("failed to build status")?;
        let last_sync = plan.last_full_sync.map(|at| at.to_rfc3339());

        if self.json {
            return print_json(&plan, last_sync);
        }
        print_tables(&plan, last_sync.as_deref(), self.all);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusJson<'a> {
    last_full_sync: Option<String>,
    summary: &'a PlanSummary,
    changes: Vec<ChangeJson<'a>>,
    warnings: usize,
}

#[derive(Serialize)]
struct ChangeJson<'a> {
    kind: &'static str,
    id: &'a str,
    classification: Classification,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "hash")]
    hash: String,
}

#[derive(Tabled)]
struct IterationRow {
    #[tabled(rename = "slug")]
    slug: String,
    #[tabled(rename = "epic")]
    epic: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "stories")]
    stories: usize,
    #[tabled(rename = "tasks")]
    tasks: usize,
}

fn print_json(plan: &SyncPlan, last_full_sync: Option<String>) -> Result<()> {
    let mut changes = Vec::new();
    collect_changes(&mut changes, "epic", &plan.epics);
    collect_changes(&mut changes, "story", &plan.stories);
    collect_changes(&mut changes, "task", &plan.tasks);

    let payload = StatusJson {
        last_full_sync,
        summary: &plan.summary,
        changes,
        warnings: plan.warnings.len(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn collect_changes<'a, T>(
    out: &mut Vec<ChangeJson<'a>>,
    kind: &'static str,
    items: &'a [Classified<T>],
) {
    out.extend(
        items
            .iter()
            .filter(|item| item.classification != Classification::Unchanged)
            .map(|item| ChangeJson {
                kind,
                id: &item.id,
                classification: item.classification,
            }),
    );
}

fn print_tables(plan: &SyncPlan, last_sync: Option<&str>, all: bool) {
    let summary = &plan.summary;
    let to_sync =
        summary.epics.pending_work() + summary.stories.pending_work() + summary.tasks.pending_work();
    println!(
        "backlog v{} | last sync {} | {} to sync | ~{} remote calls",
        env!("CARGO_PKG_VERSION"),
        last_sync.unwrap_or("never"),
        to_sync,
        summary.estimated_remote_calls,
    );

    let separator = "■".repeat(67).bright_black().to_string();
    println!("{separator}");
    println!(
        "Indicators: {} NEW  {} CHANGED  {} UNCHANGED  {} ORPHANED",
        indicator(Classification::New),
        indicator(Classification::Changed),
        indicator(Classification::Unchanged),
        indicator(Classification::Orphaned),
    );
    println!("{separator}");

    print_section("EPICS", &summary.epics, &plan.epics, all, |epic| {
        epic.title.clone()
    });
    print_section("STORIES", &summary.stories, &plan.stories, all, |story| {
        story.title.clone()
    });
    print_section("TASKS", &summary.tasks, &plan.tasks, all, |task| {
        task.enrichment
            .clean_title
            .clone()
            .unwrap_or_else(|| task.description.clone())
    });

    if !plan.iterations.is_empty() {
        println!("{}", "ITERATIONS".bold());
        let rows: Vec<IterationRow> = plan
            .iterations
            .iter()
            .map(|it| IterationRow {
                slug: it.slug.clone(),
                epic: it.epic_id.to_string(),
                action: match it.action {
                    IterationAction::Create => "CREATE".green().to_string(),
                    IterationAction::Exists => "EXISTS".bright_black().to_string(),
                },
                stories: it.story_ids.len(),
                tasks: it.task_ids.len(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{separator}");
    }

    for warning in &plan.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }

    if to_sync == 0 {
        println!("Everything is in sync.");
    }
}

fn print_section<T>(
    heading: &str,
    counts: &ClassCounts,
    items: &[Classified<T>],
    all: bool,
    title: impl Fn(&T) -> String,
) {
    println!(
        "{}  {} new, {} changed, {} unchanged, {} orphaned",
        heading.bold(),
        counts.new,
        counts.changed,
        counts.unchanged,
        counts.orphaned
    );

    let rows: Vec<ItemRow> = items
        .iter()
        .filter(|item| all || item.classification != Classification::Unchanged)
        .map(|item| ItemRow {
            id: item.id.clone(),
            status: label(item.classification),
            title: item
                .entity
                .as_ref()
                .map(|entity| truncate(&title(entity), TITLE_WIDTH))
                .unwrap_or_default(),
            hash: item.content_hash.to_string(),
        })
        .collect();
    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}

fn label(classification: Classification) -> String {
    let text = classification.to_string();
    match classification {
        Classification::New => text.green().bold().to_string(),
        Classification::Changed => text.yellow().bold().to_string(),
        Classification::Unchanged => text.bright_black().to_string(),
        Classification::Orphaned => text.magenta().bold().to_string(),
    }
}

fn indicator(classification: Classification) -> String {
    match classification {
        Classification::New => "■".green().bold().to_string(),
        Classification::Changed => "■".yellow().bold().to_string(),
        Classification::Unchanged => "■".bright_black().bold().to_string(),
        Classification::Orphaned => "■".magenta().bold().to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_titles() {
        assert_eq!(truncate("Short", 10), "Short");
    }

    #[test]
    fn truncate_is_char_based() {
        assert_eq!(truncate("ééééé", 3), "éé…");
    }
}
