//! Iteration placement.
//!
//! An epic whose status reaches `in-progress` or `done` gets an iteration.
//! Its slug is generated once from the epic id and title and then read back
//! from the snapshot on every later run, so renaming an epic never renames
//! its iteration.

use std::collections::BTreeMap;

use backlog_core::{
    Epic, EpicId, RemoteId, Story, StoryId, SyncRecord, SyncState, Task, TaskId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Epic statuses that place an epic in an iteration.
pub const TRIGGER_STATUSES: [&str; 2] = ["in-progress", "done"];

pub const MAX_SLUG_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IterationAction {
    /// No iteration with a remote id yet; create it and move everything in.
    Create,
    /// The iteration exists remotely; only move items it has not seen.
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationDirective {
    pub slug: String,
    pub epic_id: EpicId,
    pub story_ids: Vec<StoryId>,
    pub task_ids: Vec<TaskId>,
    pub action: IterationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
}

/// `epic-{id}-{title}` in kebab case, at most [`MAX_SLUG_LEN`] characters.
///
/// Runs of anything outside `[a-z0-9]` become one hyphen. Hyphens are
/// trimmed from both ends of the title part and from the end after
/// truncation.
pub fn generate_slug(epic_id: &EpicId, title: &str) -> String {
    let mut kebab = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            kebab.push(c);
        } else if !kebab.ends_with('-') {
            kebab.push('-');
        }
    }
    let kebab = kebab.trim_matches('-');

    let full = if kebab.is_empty() {
        format!("epic-{epic_id}")
    } else {
        format!("epic-{epic_id}-{kebab}")
    };
    let truncated: String = full.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Whether `status` places an epic in an iteration.
pub fn is_trigger_status(status: &str) -> bool {
    TRIGGER_STATUSES.contains(&status.trim().to_lowercase().as_str())
}

/// Already created remotely, and so already moved into its iteration.
fn placed(records: &BTreeMap<String, SyncRecord>, id: &str) -> bool {
    records.get(id).is_some_and(SyncRecord::is_settled)
}

/// One directive per epic in the trigger set, in epic order.
pub fn plan_iterations(
    epics: &[Epic],
    stories: &[Story],
    tasks: &[Task],
    prior: &SyncState,
) -> Vec<IterationDirective> {
    let mut stories_by_epic: BTreeMap<&EpicId, Vec<&StoryId>> = BTreeMap::new();
    for story in stories {
        stories_by_epic.entry(&story.epic_id).or_default().push(&story.id);
    }
    let mut tasks_by_story: BTreeMap<&StoryId, Vec<&TaskId>> = BTreeMap::new();
    for task in tasks {
        tasks_by_story.entry(&task.story_id).or_default().push(&task.id);
    }

    let mut directives = Vec::new();
    for epic in epics {
        if !epic.status.as_deref().is_some_and(is_trigger_status) {
            continue;
        }

        let story_ids: Vec<StoryId> = stories_by_epic
            .get(&epic.id)
            .map(|ids| ids.iter().map(|id| (*id).clone()).collect())
            .unwrap_or_default();
        let task_ids: Vec<TaskId> = story_ids
            .iter()
            .flat_map(|sid| tasks_by_story.get(sid).into_iter().flatten())
            .map(|id| (*id).clone())
            .collect();

        let existing = prior.iteration_for_epic(epic.id.as_str());
        let slug = match existing {
            Some((slug, _)) => slug.to_string(),
            None => generate_slug(&epic.id, &epic.title),
        };

        let directive = match existing.and_then(|(_, record)| record.usable_remote_id()) {
            Some(remote) => IterationDirective {
                slug,
                epic_id: epic.id.clone(),
                story_ids: story_ids
                    .into_iter()
                    .filter(|id| !placed(&prior.stories, id.as_str()))
                    .collect(),
                task_ids: task_ids
                    .into_iter()
                    .filter(|id| !placed(&prior.tasks, id.as_str()))
                    .collect(),
                action: IterationAction::Exists,
                remote_id: Some(remote.clone()),
            },
            None => IterationDirective {
                slug,
                epic_id: epic.id.clone(),
                story_ids,
                task_ids,
                action: IterationAction::Create,
                remote_id: None,
            },
        };
        debug!(
            "iteration {} for epic {}: {:?} ({} stories, {} tasks)",
            directive.slug,
            epic.id,
            directive.action,
            directive.story_ids.len(),
            directive.task_ids.len()
        );
        directives.push(directive);
    }

    directives
}
