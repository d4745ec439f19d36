//! Markdown artifact parsing for `backlog-parser`.
//!
//! [`load_project`] reads the epic document, the story documents found under
//! the stories directory, and the sprint-status document, and returns a
//! [`ParsedProject`]. [`parse_documents`] does the same from in-memory text,
//! so every extraction rule is testable without touching the filesystem.
//!
//! Only a missing epic document is fatal. Everything else degrades to a
//! [`ParseWarning`] attached to the entity it concerns.

pub mod discovery;
pub mod enrich;
pub mod epics;
pub mod error;
pub mod heading;
pub mod status;
pub mod story_file;

mod patterns;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use backlog_core::{
    Epic, EpicStatuses, ParseWarning, ProjectConfig, Story, StoryId, Task, WarningKind,
};
use serde::Serialize;
use tracing::{debug, info};

pub use discovery::{discover_story_files, DiscoveryPass, StoryFileLocation};
pub use epics::{parse_epic_document, EpicDocument};
pub use error::ParseError;
pub use heading::{detect_heading_levels, HeadingLevels};
pub use status::parse_epic_statuses;
pub use story_file::{parse_story_document, StoryDocument};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where the input documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub epics: PathBuf,
    pub stories_dir: Option<PathBuf>,
    pub sprint_status: Option<PathBuf>,
}

impl Sources {
    pub fn from_config(config: &ProjectConfig) -> Result<Self, ParseError> {
        let epics = config.epics.clone().ok_or(ParseError::EpicsNotConfigured)?;
        Ok(Self {
            epics,
            stories_dir: config.stories_dir.clone(),
            sprint_status: config.sprint_status.clone(),
        })
    }
}

/// The text of one story document, keyed by the id it was discovered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryInput {
    pub story_id: StoryId,
    pub path: PathBuf,
    pub content: String,
}

/// Entity graph extracted from all input documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedProject {
    pub epics: Vec<Epic>,
    pub stories: Vec<Story>,
    /// Ordered by story id; regular tasks before review follow-ups per story.
    pub tasks: Vec<Task>,
    pub epic_statuses: EpicStatuses,
    /// Status of every story document read, including ones the epic
    /// document does not name.
    pub story_statuses: BTreeMap<StoryId, String>,
    pub story_file_paths: BTreeMap<StoryId, PathBuf>,
    pub warnings: Vec<ParseWarning>,
}

/// Entity counts, printed by `backlog parse`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCounts {
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub review_followups: usize,
    pub story_files: usize,
    pub epic_statuses: usize,
    pub warnings: usize,
}

impl ParsedProject {
    pub fn counts(&self) -> ProjectCounts {
        ProjectCounts {
            epics: self.epics.len(),
            stories: self.stories.len(),
            tasks: self.tasks.len(),
            review_followups: self.tasks.iter().filter(|t| t.is_review_followup()).count(),
            story_files: self.story_file_paths.len(),
            epic_statuses: self.epic_statuses.len(),
            warnings: self.warnings.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read every document named by `sources` and build the entity graph.
pub fn load_project(sources: &Sources) -> Result<ParsedProject, ParseError> {
    if !sources.epics.is_file() {
        return Err(ParseError::MissingRequiredDocument {
            path: sources.epics.clone(),
        });
    }
    let epic_text = fs::read_to_string(&sources.epics).map_err(|e| error::io_err(&sources.epics, e))?;

    let status_text = match &sources.sprint_status {
        Some(path) if path.is_file() => {
            Some(fs::read_to_string(path).map_err(|e| error::io_err(path, e))?)
        }
        Some(path) => {
            debug!("sprint status {} not found; no epic statuses", path.display());
            None
        }
        None => None,
    };

    let doc = parse_epic_document(&epic_text);
    let mut warnings = Vec::new();
    let mut story_inputs = Vec::new();

    if let Some(dir) = &sources.stories_dir {
        let known: Vec<StoryId> = doc.stories.iter().map(|s| s.id.clone()).collect();
        let locations = discover_story_files(dir, &known)?;
        let located: BTreeSet<&StoryId> = locations.iter().map(|l| &l.story_id).collect();

        for id in known.iter().filter(|id| !located.contains(id)) {
            warnings.push(ParseWarning::new(
                id.to_string(),
                WarningKind::MissingStoryFile,
                format!("no story document under {}", dir.display()),
            ));
        }

        for location in &locations {
            match read_story(&location.path) {
                Ok(content) => story_inputs.push(StoryInput {
                    story_id: location.story_id.clone(),
                    path: location.path.clone(),
                    content,
                }),
                Err(message) => warnings.push(ParseWarning::new(
                    location.story_id.to_string(),
                    WarningKind::MalformedArtifact,
                    message,
                )),
            }
        }
    }

    let mut project = assemble(doc, &story_inputs, status_text.as_deref());
    project.warnings.extend(warnings);
    info!(
        "parsed {} epics, {} stories, {} tasks ({} warnings)",
        project.epics.len(),
        project.stories.len(),
        project.tasks.len(),
        project.warnings.len()
    );
    Ok(project)
}

/// Build the entity graph from already-read document text.
pub fn parse_documents(
    epic_text: &str,
    story_inputs: &[StoryInput],
    status_text: Option<&str>,
) -> ParsedProject {
    assemble(parse_epic_document(epic_text), story_inputs, status_text)
}

fn assemble(doc: EpicDocument, story_inputs: &[StoryInput], status_text: Option<&str>) -> ParsedProject {
    let EpicDocument {
        mut epics,
        mut stories,
        warnings,
        ..
    } = doc;
    let mut project = ParsedProject {
        warnings,
        ..ParsedProject::default()
    };

    project.epic_statuses = status_text.map(parse_epic_statuses).unwrap_or_default();
    for epic in &mut epics {
        epic.status = project.epic_statuses.get(&epic.id).cloned();
    }

    let mut tasks_by_story: BTreeMap<StoryId, Vec<Task>> = BTreeMap::new();
    for input in story_inputs {
        let parsed = parse_story_document(&input.story_id, &input.content);
        match stories.iter_mut().find(|s| s.id == input.story_id) {
            Some(story) => story.status = parsed.status.clone(),
            None => project.warnings.push(ParseWarning::new(
                input.story_id.to_string(),
                WarningKind::DanglingReference,
                format!(
                    "{} is not named in the epic document; its tasks are kept",
                    input.path.display()
                ),
            )),
        }
        if let Some(status) = parsed.status {
            project.story_statuses.insert(input.story_id.clone(), status);
        }
        project
            .story_file_paths
            .insert(input.story_id.clone(), input.path.clone());
        tasks_by_story
            .entry(input.story_id.clone())
            .or_default()
            .extend(parsed.tasks);
    }

    let mut tasks: Vec<Task> = tasks_by_story.into_values().flatten().collect();
    enrich::enrich_tasks(&mut tasks);

    project.epics = epics;
    project.stories = stories;
    project.tasks = tasks;
    project
}

/// Story documents must be UTF-8; anything else is reported, not fatal.
fn read_story(path: &Path) -> Result<String, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    String::from_utf8(bytes).map_err(|_| format!("{} is not valid UTF-8", path.display()))
}
