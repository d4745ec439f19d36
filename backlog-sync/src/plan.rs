//! The sync plan handed to the remote-sync collaborator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use backlog_core::{
    Epic, EpicStatuses, IterationRecord, ParseWarning, Story, StoryId, SyncState, Task,
};
use chrono::{DateTime, Utc};
use backlog_parser::ParsedProject;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, Classification, Classified};
use crate::digest::HASH_SCOPE_VERSION;
use crate::error::{io_err, SyncError};
use crate::iteration::{plan_iterations, IterationAction, IterationDirective};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCounts {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub orphaned: usize,
}

impl ClassCounts {
    pub fn of<T>(items: &[Classified<T>]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.classification {
                Classification::New => counts.new += 1,
                Classification::Changed => counts.changed += 1,
                Classification::Unchanged => counts.unchanged += 1,
                Classification::Orphaned => counts.orphaned += 1,
            }
        }
        counts
    }

    /// Items the collaborator has to create or update.
    pub fn pending_work(&self) -> usize {
        self.new + self.changed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationCounts {
    pub create: usize,
    pub exists: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub hash_scope_version: u32,
    pub epics: ClassCounts,
    pub stories: ClassCounts,
    pub tasks: ClassCounts,
    pub iterations: IterationCounts,
    /// Rough number of remote calls the plan will cost.
    pub estimated_remote_calls: usize,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    pub epics: Vec<Classified<Epic>>,
    pub stories: Vec<Classified<Story>>,
    pub tasks: Vec<Classified<Task>>,
    pub iterations: Vec<IterationDirective>,
    #[serde(default)]
    pub epic_statuses: EpicStatuses,
    #[serde(default)]
    pub story_file_paths: BTreeMap<StoryId, PathBuf>,
    #[serde(default)]
    pub warnings: Vec<ParseWarning>,
    /// `lastFullSync` of the snapshot the plan was built against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_full_sync: Option<DateTime<Utc>>,
    /// Every iteration already in the snapshot. Write-back keeps these so an
    /// assigned slug survives runs where its epic leaves the trigger set.
    #[serde(default)]
    pub prior_iterations: BTreeMap<String, IterationRecord>,
    pub summary: PlanSummary,
}

/// Classify every entity and place active epics in iterations.
pub fn build_plan(parsed: ParsedProject, prior: &SyncState) -> SyncPlan {
    let epics = classify(&parsed.epics, &prior.epics);
    let stories = classify(&parsed.stories, &prior.stories);
    let tasks = classify(&parsed.tasks, &prior.tasks);
    let iterations = plan_iterations(&parsed.epics, &parsed.stories, &parsed.tasks, prior);

    let mut plan = SyncPlan {
        epics,
        stories,
        tasks,
        iterations,
        epic_statuses: parsed.epic_statuses,
        story_file_paths: parsed.story_file_paths,
        warnings: parsed.warnings,
        last_full_sync: prior.last_full_sync,
        prior_iterations: prior.iterations.clone(),
        summary: PlanSummary::default(),
    };
    plan.summary = summarize(&plan);
    plan
}

fn summarize(plan: &SyncPlan) -> PlanSummary {
    let epics = ClassCounts::of(&plan.epics);
    let stories = ClassCounts::of(&plan.stories);
    let tasks = ClassCounts::of(&plan.tasks);

    let mut iterations = IterationCounts::default();
    for directive in &plan.iterations {
        match directive.action {
            IterationAction::Create => iterations.create += 1,
            IterationAction::Exists => iterations.exists += 1,
        }
    }

    PlanSummary {
        hash_scope_version: HASH_SCOPE_VERSION,
        epics,
        stories,
        tasks,
        iterations,
        estimated_remote_calls: estimate_remote_calls(plan, &epics, &stories, &tasks),
    }
}

fn estimate_remote_calls(
    plan: &SyncPlan,
    epics: &ClassCounts,
    stories: &ClassCounts,
    tasks: &ClassCounts,
) -> usize {
    // New stories with a real status need a follow-up state update.
    let story_state_updates = plan
        .stories
        .iter()
        .filter(|s| s.classification == Classification::New)
        .filter_map(|s| s.entity.as_ref()?.status.as_deref())
        .filter(|status| !status.is_empty() && *status != "draft")
        .count();

    // Upload + relation per story document not yet attached.
    let attachments = plan
        .stories
        .iter()
        .filter(|s| plan.story_file_paths.contains_key(&StoryId::from(s.id.as_str())))
        .filter(|s| match s.classification {
            Classification::New | Classification::Changed => true,
            Classification::Unchanged => !s.attached,
            Classification::Orphaned => false,
        })
        .count()
        * 2;

    let moves: usize = plan
        .iterations
        .iter()
        .map(|it| {
            let items = it.story_ids.len() + it.task_ids.len();
            match it.action {
                IterationAction::Create => 2 + items,
                IterationAction::Exists => items,
            }
        })
        .sum();

    epics.pending_work()
        + stories.new * 2
        + story_state_updates
        + stories.changed
        + tasks.new * 2
        + tasks.changed
        + attachments
        + moves
}

// ---------------------------------------------------------------------------
// Plan files
// ---------------------------------------------------------------------------

/// Write `plan` as pretty JSON via `<path>.tmp` + rename.
pub fn save_plan_at(path: &Path, plan: &SyncPlan) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let json = serde_json::to_string_pretty(plan)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

pub fn load_plan_at(path: &Path) -> Result<SyncPlan, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}
