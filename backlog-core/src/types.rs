//! Domain types for the backlog entity graph.
//!
//! Ids are newtypes over the literal identifiers found in the planning
//! documents (`"3"`, `"3.2"`, `"3.2-T1"`, `"3.2-R1.4"`). They order
//! naturally, so `"1.10"` sorts after `"1.9"`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Natural id ordering
// ---------------------------------------------------------------------------

/// One run of digits or non-digits inside an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdSegment {
    Number(u64),
    Text(String),
}

/// Split an id into digit and non-digit runs so numeric parts compare by value.
///
/// `"1.1-T10"` → `[1, ".", 1, "-T", 10]`.
pub fn id_sort_key(id: &str) -> Vec<IdSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in id.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            segments.push(segment(&current, in_digits));
            current.clear();
        }
        in_digits = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        segments.push(segment(&current, in_digits));
    }
    segments
}

fn segment(run: &str, digits: bool) -> IdSegment {
    if digits {
        if let Ok(n) = run.parse() {
            return IdSegment::Number(n);
        }
    }
    IdSegment::Text(run.to_owned())
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    id_sort_key(a)
        .cmp(&id_sort_key(b))
        .then_with(|| a.cmp(b))
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Numeric epic identifier as written in `Epic N:` headings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpicId(pub String);

impl EpicId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EpicId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EpicId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Ord for EpicId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for EpicId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `"N.M"` story identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub String);

impl StoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The epic this story id points at (the part before the first `.`).
    pub fn epic_id(&self) -> EpicId {
        EpicId::from(self.0.split('.').next().unwrap_or_default())
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StoryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Ord for StoryId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for StoryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Task, subtask, or review follow-up identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Ord for TaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for TaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Truncated lowercase-hex content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(pub String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Epic id → development status, as read from the status document.
pub type EpicStatuses = BTreeMap<EpicId, String>;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A top-level planning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    pub id: EpicId,
    pub title: String,
    pub description: String,
    pub phase: String,
    /// Sorted, unique `FR-`/`NFR-`/`ARCH-` reference tokens.
    pub requirements: Vec<String>,
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A story under an epic. `epic_id` is a lookup key, not ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub epic_id: EpicId,
    pub title: String,
    pub user_story_text: String,
    /// Verbatim acceptance-criteria block; hashed as one unit.
    pub acceptance_criteria: String,
    pub requirements: Vec<String>,
    /// Lowercased `Status:` value from the story document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Whether a task came from the regular task list or a review pass.
///
/// Serialized flat onto the task as `isReviewFollowup` / `reviewRound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "KindFields", from = "KindFields")]
pub enum TaskKind {
    #[default]
    Task,
    ReviewFollowup { round: u32 },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KindFields {
    #[serde(default)]
    is_review_followup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    review_round: Option<u32>,
}

impl From<TaskKind> for KindFields {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Task => Self {
                is_review_followup: false,
                review_round: None,
            },
            TaskKind::ReviewFollowup { round } => Self {
                is_review_followup: true,
                review_round: Some(round),
            },
        }
    }
}

impl From<KindFields> for TaskKind {
    fn from(fields: KindFields) -> Self {
        if fields.is_review_followup {
            TaskKind::ReviewFollowup {
                round: fields.review_round.unwrap_or(1),
            }
        } else {
            TaskKind::Task
        }
    }
}

/// An indented checkbox line under a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: TaskId,
    pub description: String,
    pub complete: bool,
}

/// Derived annotations. Never part of any content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnrichment {
    #[serde(default)]
    pub ac_references: Vec<u32>,
    #[serde(default)]
    pub subtask_html: String,
    /// 1 = high, 2 = medium, 3 = low.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_title: Option<String>,
}

/// A checkbox task or review follow-up belonging to a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub story_id: StoryId,
    pub description: String,
    pub complete: bool,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(flatten)]
    pub enrichment: TaskEnrichment,
}

impl Task {
    pub fn is_review_followup(&self) -> bool {
        matches!(self.kind, TaskKind::ReviewFollowup { .. })
    }

    pub fn review_round(&self) -> Option<u32> {
        match self.kind {
            TaskKind::ReviewFollowup { round } => Some(round),
            TaskKind::Task => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Category of a non-fatal, entity-local parse problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    MalformedArtifact,
    MissingStoryFile,
    DanglingReference,
    AmbiguousHeadingLevel,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MalformedArtifact => write!(f, "malformed artifact"),
            WarningKind::MissingStoryFile => write!(f, "missing story file"),
            WarningKind::DanglingReference => write!(f, "dangling reference"),
            WarningKind::AmbiguousHeadingLevel => write!(f, "ambiguous heading level"),
        }
    }
}

/// A warning attached to the id of the entity it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    pub entity_id: String,
    pub kind: WarningKind,
    pub message: String,
}

impl ParseWarning {
    pub fn new(entity_id: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entity_id.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.kind, self.entity_id, self.message)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(EpicId::from("3").to_string(), "3");
        assert_eq!(StoryId::from("3.2").to_string(), "3.2");
        assert_eq!(TaskId::from("3.2-T1").to_string(), "3.2-T1");
    }

    #[test]
    fn story_id_knows_its_epic() {
        assert_eq!(StoryId::from("12.4").epic_id(), EpicId::from("12"));
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![
            StoryId::from("1.10"),
            StoryId::from("1.2"),
            StoryId::from("10.1"),
            StoryId::from("2.1"),
        ];
        ids.sort();
        let ordered: Vec<_> = ids.iter().map(|s| s.0.as_str()).collect();
        assert_eq!(ordered, ["1.2", "1.10", "2.1", "10.1"]);
    }

    #[test]
    fn task_ids_put_numbers_before_text() {
        assert!(TaskId::from("1.1-T2") < TaskId::from("1.1-T10"));
        assert!(id_sort_key("1") < id_sort_key("a"));
    }

    #[test]
    fn leading_zeros_stay_distinct() {
        let a = EpicId::from("01");
        let b = EpicId::from("1");
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    fn review_task(round: u32) -> Task {
        Task {
            id: TaskId::from(format!("1.1-R{round}.1")),
            story_id: StoryId::from("1.1"),
            description: "[HIGH] fix".to_string(),
            complete: false,
            kind: TaskKind::ReviewFollowup { round },
            subtasks: Vec::new(),
            enrichment: TaskEnrichment {
                priority: Some(1),
                clean_title: Some("fix".to_string()),
                ..TaskEnrichment::default()
            },
        }
    }

    #[test]
    fn review_followup_fields_sit_on_the_task() {
        let yaml = serde_yaml::to_string(&review_task(2)).expect("serialize");
        assert!(yaml.contains("isReviewFollowup: true"), "{yaml}");
        assert!(yaml.contains("reviewRound: 2"), "{yaml}");
        assert!(yaml.contains("cleanTitle: fix"), "{yaml}");
        assert!(yaml.contains("priority: 1"), "{yaml}");
        assert!(!yaml.contains("kind"), "{yaml}");
        assert!(!yaml.contains("enrichment"), "{yaml}");

        let back: Task = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, review_task(2));
    }

    #[test]
    fn regular_task_is_not_a_followup() {
        let task = Task {
            kind: TaskKind::Task,
            enrichment: TaskEnrichment::default(),
            ..review_task(1)
        };
        let yaml = serde_yaml::to_string(&task).expect("serialize");
        assert!(yaml.contains("isReviewFollowup: false"), "{yaml}");
        assert!(!yaml.contains("reviewRound"), "{yaml}");
        let back: Task = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back.kind, TaskKind::Task);
    }

    #[test]
    fn warning_display_includes_entity() {
        let w = ParseWarning::new("1.1", WarningKind::MissingStoryFile, "no story document");
        assert_eq!(w.to_string(), "missing story file [1.1]: no story document");
    }
}
