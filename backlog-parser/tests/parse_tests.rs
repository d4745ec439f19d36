//! End-to-end parsing tests for `backlog-parser`.
//!
//! Each test builds its own artifact tree in a `TempDir`.

use std::fs;
use std::path::{Path, PathBuf};

use backlog_core::{EpicId, StoryId, WarningKind};
use backlog_parser::{load_project, ParseError, Sources};
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const EPICS: &str = "\
# Demo Project

## Epic 1: Foundation

Base platform work.
**Phase:** MVP

### Story 1.1: Scaffold

As a developer, I want a workspace.

**Acceptance Criteria:**
- builds cleanly

### Story 1.2: Config

As an operator, I want config files.
";

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(&path, content).expect("write fixture");
    path
}

fn sources(root: &Path) -> Sources {
    Sources {
        epics: root.join("epics.md"),
        stories_dir: Some(root.join("stories")),
        sprint_status: Some(root.join("sprint-status.yaml")),
    }
}

// ---------------------------------------------------------------------------
// Required and optional documents
// ---------------------------------------------------------------------------

#[test]
fn missing_epic_document_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_project(&sources(dir.path())).unwrap_err();
    assert!(
        matches!(err, ParseError::MissingRequiredDocument { .. }),
        "got: {err}"
    );
}

#[test]
fn optional_documents_may_be_absent() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);

    let project = load_project(&sources(dir.path())).expect("load");
    assert_eq!(project.epics.len(), 1);
    assert_eq!(project.stories.len(), 2);
    assert!(project.epic_statuses.is_empty());
    assert!(project.tasks.is_empty());
}

#[test]
fn missing_story_files_warn_only_with_stories_dir() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    fs::create_dir_all(dir.path().join("stories")).expect("mkdir");

    let project = load_project(&sources(dir.path())).expect("load");
    let missing: Vec<_> = project
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::MissingStoryFile)
        .map(|w| w.entity_id.as_str())
        .collect();
    assert_eq!(missing, vec!["1.1", "1.2"]);

    let no_dir = Sources {
        stories_dir: None,
        ..sources(dir.path())
    };
    let project = load_project(&no_dir).expect("load");
    assert!(project.warnings.is_empty());
}

// ---------------------------------------------------------------------------
// Story documents
// ---------------------------------------------------------------------------

#[rstest]
#[case("stories/1.1/story.md")]
#[case("stories/1-1-scaffold.md")]
fn both_layouts_supply_tasks(#[case] rel: &str) {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    write(
        dir.path(),
        rel,
        "Status: Done\n\n## Tasks / Subtasks\n\n- [x] Init (AC: 1)\n  - [x] cargo new\n",
    );

    let project = load_project(&sources(dir.path())).expect("load");
    assert_eq!(project.tasks.len(), 1);
    let task = &project.tasks[0];
    assert_eq!(task.id.as_str(), "1.1-T1");
    assert_eq!(task.enrichment.ac_references, vec![1]);
    assert!(task.enrichment.subtask_html.contains("&#9745; cargo new"));
    assert_eq!(project.stories[0].status.as_deref(), Some("done"));
    assert!(project.story_file_paths[&StoryId::from("1.1")].ends_with(rel.trim_start_matches("stories/")));
}

#[test]
fn earlier_pass_wins_over_stale_flat_copy() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    write(
        dir.path(),
        "stories/1.1/story.md",
        "## Tasks / Subtasks\n- [ ] current\n",
    );
    write(
        dir.path(),
        "stories/1-1-old.md",
        "## Tasks / Subtasks\n- [ ] stale\n- [ ] stale two\n",
    );

    let project = load_project(&sources(dir.path())).expect("load");
    let descriptions: Vec<_> = project
        .tasks
        .iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["current"]);
}

#[test]
fn non_utf8_story_file_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    let path = dir.path().join("stories/1-2-config.md");
    fs::create_dir_all(dir.path().join("stories")).expect("mkdir");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).expect("write");

    let project = load_project(&sources(dir.path())).expect("load");
    let malformed: Vec<_> = project
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::MalformedArtifact)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].entity_id, "1.2");
}

#[test]
fn epic_status_flows_from_sprint_document() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    write(
        dir.path(),
        "sprint-status.yaml",
        "development_status:\n  epic-1: Contexted\n  1-1-scaffold: done\n",
    );

    let project = load_project(&sources(dir.path())).expect("load");
    assert_eq!(project.epics[0].status.as_deref(), Some("contexted"));
    assert_eq!(
        project.epic_statuses.get(&EpicId::from("1")).map(String::as_str),
        Some("contexted")
    );
}

#[test]
fn loading_twice_is_identical() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "epics.md", EPICS);
    write(dir.path(), "stories/1-2-config.md", "## Tasks / Subtasks\n- [ ] a\n");
    write(dir.path(), "stories/1.1/story.md", "## Tasks / Subtasks\n- [ ] b\n");

    let first = load_project(&sources(dir.path())).expect("load");
    let second = load_project(&sources(dir.path())).expect("load");
    assert_eq!(first, second);
}
