//! Merge a sync plan with the collaborator's results into a new snapshot.
//!
//! The collaborator performs the remote calls and reports the ids it got
//! back. Anything it could not create is kept as `pending` so the next plan
//! classifies it `NEW` again.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use backlog_core::{
    state, IterationRecord, ProjectConfig, RecordStatus, RemoteId, SyncRecord, SyncState,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::Classified;
use crate::error::{io_err, SyncError};
use crate::plan::SyncPlan;

// ---------------------------------------------------------------------------
// Results document
// ---------------------------------------------------------------------------

/// Outcome of the remote calls, as reported by the collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResults {
    #[serde(default)]
    pub epic_id_map: BTreeMap<String, Option<RemoteId>>,
    #[serde(default)]
    pub story_id_map: BTreeMap<String, Option<RemoteId>>,
    #[serde(default)]
    pub task_id_map: BTreeMap<String, Option<RemoteId>>,
    #[serde(default)]
    pub stories: StoryResults,
    #[serde(default)]
    pub iterations: IterationResults,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResults {
    /// Stories whose document was attached in this run.
    #[serde(default)]
    pub attached_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResults {
    #[serde(default)]
    pub created: Vec<IterationOutcome>,
    #[serde(default)]
    pub skipped: Vec<IterationOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationOutcome {
    pub slug: String,
    #[serde(default)]
    pub epic_id: String,
    #[serde(rename = "devopsId", default)]
    pub remote_id: Option<RemoteId>,
}

impl SyncResults {
    /// Iteration outcomes by slug; `created` wins over `skipped`.
    fn iteration_outcomes(&self) -> BTreeMap<&str, &IterationOutcome> {
        let mut map = BTreeMap::new();
        for outcome in self.iterations.created.iter().chain(&self.iterations.skipped) {
            if !outcome.slug.is_empty() {
                map.entry(outcome.slug.as_str()).or_insert(outcome);
            }
        }
        map
    }
}

pub fn load_results_at(path: &Path) -> Result<SyncResults, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteBackCounts {
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub iterations: usize,
    pub pending_stories: usize,
    pub pending_tasks: usize,
}

fn usable(id: Option<&Option<RemoteId>>) -> Option<&RemoteId> {
    id.and_then(Option::as_ref).filter(|id| id.is_usable())
}

/// Remote id from this run's results, else the one carried in the plan.
fn resolve<'a, T>(
    item: &'a Classified<T>,
    fresh: &'a BTreeMap<String, Option<RemoteId>>,
) -> Option<&'a RemoteId> {
    usable(fresh.get(&item.id)).or(item.remote_id.as_ref().filter(|id| id.is_usable()))
}

/// `\{project}\Iteration\{root}\{slug}`; the root segment is optional.
pub fn iteration_path(config: &ProjectConfig, slug: &str) -> String {
    let project = config.project_name.as_deref().unwrap_or_default();
    match config.iteration_root_path.as_deref().filter(|r| !r.is_empty()) {
        Some(root) => format!("\\{project}\\Iteration\\{root}\\{slug}"),
        None => format!("\\{project}\\Iteration\\{slug}"),
    }
}

/// Build the next snapshot from `plan` and `results`.
pub fn apply(
    plan: &SyncPlan,
    results: &SyncResults,
    config: &ProjectConfig,
    timestamp: DateTime<Utc>,
) -> (SyncState, WriteBackCounts) {
    let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut next = SyncState {
        last_full_sync: Some(timestamp),
        ..SyncState::default()
    };
    let mut counts = WriteBackCounts::default();

    // Epics
    let mut epic_remote: BTreeMap<&str, &RemoteId> = BTreeMap::new();
    for epic in plan.epics.iter().filter(|e| !e.is_orphaned()) {
        let Some(remote) = resolve(epic, &results.epic_id_map) else {
            debug!("epic {} has no remote id; left for the next run", epic.id);
            continue;
        };
        epic_remote.insert(epic.id.as_str(), remote);
        next.epics.insert(
            epic.id.clone(),
            SyncRecord {
                remote_id: Some(remote.clone()),
                content_hash: epic.content_hash.0.clone(),
                last_synced: Some(stamp.clone()),
                status: RecordStatus::Synced,
                ..SyncRecord::default()
            },
        );
        counts.epics += 1;
    }

    // Stories
    let attached: BTreeSet<&str> = results
        .stories
        .attached_ids
        .iter()
        .map(String::as_str)
        .chain(plan.stories.iter().filter(|s| s.attached).map(|s| s.id.as_str()))
        .collect();
    let mut story_remote: BTreeMap<&str, &RemoteId> = BTreeMap::new();
    for story in plan.stories.iter().filter(|s| !s.is_orphaned()) {
        let record = match resolve(story, &results.story_id_map) {
            Some(remote) => {
                story_remote.insert(story.id.as_str(), remote);
                let epic_id = story.entity.as_ref().map(|s| s.epic_id.as_str());
                SyncRecord {
                    remote_id: Some(remote.clone()),
                    epic_remote_id: epic_id
                        .and_then(|id| epic_remote.get(id))
                        .map(|id| (*id).clone()),
                    content_hash: story.content_hash.0.clone(),
                    last_synced: Some(stamp.clone()),
                    status: RecordStatus::Synced,
                    attached: attached.contains(story.id.as_str()),
                    ..SyncRecord::default()
                }
            }
            None => {
                counts.pending_stories += 1;
                pending(story, &stamp)
            }
        };
        next.stories.insert(story.id.clone(), record);
        counts.stories += 1;
    }

    // Tasks
    for task in plan.tasks.iter().filter(|t| !t.is_orphaned()) {
        let record = match resolve(task, &results.task_id_map) {
            Some(remote) => {
                let story_id = task.entity.as_ref().map(|t| t.story_id.as_str());
                SyncRecord {
                    remote_id: Some(remote.clone()),
                    story_remote_id: story_id
                        .and_then(|id| story_remote.get(id))
                        .map(|id| (*id).clone()),
                    content_hash: task.content_hash.0.clone(),
                    last_synced: Some(stamp.clone()),
                    status: RecordStatus::Synced,
                    ..SyncRecord::default()
                }
            }
            None => {
                counts.pending_tasks += 1;
                pending(task, &stamp)
            }
        };
        next.tasks.insert(task.id.clone(), record);
        counts.tasks += 1;
    }

    // Iterations
    let outcomes = results.iteration_outcomes();
    for directive in &plan.iterations {
        let fresh = outcomes
            .get(directive.slug.as_str())
            .and_then(|o| o.remote_id.as_ref())
            .filter(|id| id.is_usable());
        let carried = directive.remote_id.as_ref().filter(|id| id.is_usable());
        let Some(remote) = fresh.or(carried) else {
            continue;
        };
        next.iterations.insert(
            directive.slug.clone(),
            IterationRecord {
                epic_id: directive.epic_id.to_string(),
                remote_id: Some(remote.clone()),
                remote_path: Some(iteration_path(config, &directive.slug)),
                last_synced: Some(stamp.clone()),
            },
        );
        counts.iterations += 1;
    }
    for (slug, outcome) in outcomes {
        if next.iterations.contains_key(slug) {
            continue;
        }
        let Some(remote) = outcome.remote_id.as_ref().filter(|id| id.is_usable()) else {
            continue;
        };
        next.iterations.insert(
            slug.to_string(),
            IterationRecord {
                epic_id: outcome.epic_id.clone(),
                remote_id: Some(remote.clone()),
                remote_path: Some(iteration_path(config, slug)),
                last_synced: Some(stamp.clone()),
            },
        );
        counts.iterations += 1;
    }
    for (slug, record) in &plan.prior_iterations {
        if next.iterations.contains_key(slug) {
            continue;
        }
        debug!("iteration {slug} not planned this run; kept");
        next.iterations.insert(slug.clone(), record.clone());
        counts.iterations += 1;
    }

    (next, counts)
}

fn pending<T>(item: &Classified<T>, stamp: &str) -> SyncRecord {
    SyncRecord {
        content_hash: item.content_hash.0.clone(),
        last_synced: Some(stamp.to_string()),
        status: RecordStatus::Pending,
        ..SyncRecord::default()
    }
}

/// [`apply`] and save the snapshot to `config.state`.
pub fn commit(
    plan: &SyncPlan,
    results: &SyncResults,
    config: &ProjectConfig,
    timestamp: DateTime<Utc>,
) -> Result<WriteBackCounts, SyncError> {
    let (next, counts) = apply(plan, results, config, timestamp);
    state::save_at(&config.state, &next)?;
    info!(
        "sync state written to {}: {} epics, {} stories ({} pending), {} tasks ({} pending), {} iterations",
        config.state.display(),
        counts.epics,
        counts.stories,
        counts.pending_stories,
        counts.tasks,
        counts.pending_tasks,
        counts.iterations
    );
    Ok(counts)
}
