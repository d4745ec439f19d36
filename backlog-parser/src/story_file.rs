//! Story document parsing: status, checkbox tasks, and review follow-ups.

use std::collections::BTreeMap;

use backlog_core::{StoryId, Subtask, Task, TaskEnrichment, TaskId, TaskKind};

use crate::patterns::{
    REVIEW_HEADER_RE, SECTION_HEADING_RE, STATUS_RE, SUBTASK_LINE_RE, TASKS_HEADER_RE,
    TASKS_HEADING_RE, TASK_LINE_RE, TOP_SECTION_RE,
};

/// What one story document contributes to the project model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryDocument {
    /// Lowercased `Status:` value.
    pub status: Option<String>,
    /// Regular tasks in document order, then review follow-ups.
    pub tasks: Vec<Task>,
}

pub fn parse_story_document(story_id: &StoryId, content: &str) -> StoryDocument {
    let lines: Vec<&str> = content.lines().collect();
    let mut tasks = parse_tasks(story_id, &lines);
    tasks.extend(parse_review_followups(story_id, &lines));
    StoryDocument {
        status: parse_status(&lines),
        tasks,
    }
}

fn parse_status(lines: &[&str]) -> Option<String> {
    lines.iter().find_map(|line| {
        STATUS_RE
            .captures(line.trim())
            .map(|caps| caps[1].trim().trim_matches('*').trim().to_lowercase())
            .filter(|status| !status.is_empty())
    })
}

fn is_checked(mark: &str) -> bool {
    mark.eq_ignore_ascii_case("x")
}

/// Checkbox lines under `## Tasks / Subtasks`. Indented checkboxes become
/// subtasks of the closest task above them.
fn parse_tasks(story_id: &StoryId, lines: &[&str]) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();
    let mut in_section = false;

    for line in lines {
        if TASKS_HEADER_RE.is_match(line) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if SECTION_HEADING_RE.is_match(line) && !TASKS_HEADING_RE.is_match(line) {
            in_section = false;
            continue;
        }

        if let Some(caps) = TASK_LINE_RE.captures(line) {
            tasks.push(Task {
                id: TaskId::from(format!("{story_id}-T{}", tasks.len() + 1)),
                story_id: story_id.clone(),
                description: caps[2].trim().to_string(),
                complete: is_checked(&caps[1]),
                kind: TaskKind::Task,
                subtasks: Vec::new(),
                enrichment: TaskEnrichment::default(),
            });
        } else if let Some(caps) = SUBTASK_LINE_RE.captures(line) {
            if let Some(parent) = tasks.last_mut() {
                let id = TaskId::from(format!("{}.{}", parent.id, parent.subtasks.len() + 1));
                parent.subtasks.push(Subtask {
                    id,
                    description: caps[2].trim().to_string(),
                    complete: is_checked(&caps[1]),
                });
            }
        }
    }

    tasks
}

/// Top-level checkbox lines under `### Review Follow-ups [Round N]` headers.
///
/// Numbering is per round; a round that appears twice keeps counting.
fn parse_review_followups(story_id: &StoryId, lines: &[&str]) -> Vec<Task> {
    let mut followups = Vec::new();
    let mut per_round: BTreeMap<u32, u32> = BTreeMap::new();
    let mut round: Option<u32> = None;

    for line in lines {
        if let Some(caps) = REVIEW_HEADER_RE.captures(line) {
            round = Some(
                caps.get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(1),
            );
            continue;
        }
        let Some(current) = round else {
            continue;
        };
        if TOP_SECTION_RE.is_match(line) {
            round = None;
            continue;
        }

        if let Some(caps) = TASK_LINE_RE.captures(line) {
            let n = per_round.entry(current).or_insert(0);
            *n += 1;
            followups.push(Task {
                id: TaskId::from(format!("{story_id}-R{current}.{n}")),
                story_id: story_id.clone(),
                description: caps[2].trim().to_string(),
                complete: is_checked(&caps[1]),
                kind: TaskKind::ReviewFollowup { round: current },
                subtasks: Vec::new(),
                enrichment: TaskEnrichment::default(),
            });
        }
    }

    followups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(doc: &StoryDocument) -> Vec<String> {
        doc.tasks.iter().map(|t| t.id.to_string()).collect()
    }

    #[test]
    fn status_label_variants() {
        let id = StoryId::from("1.1");
        for text in ["Status: Done", "**Status:** In-Progress", "status: review"] {
            let doc = parse_story_document(&id, text);
            assert!(doc.status.is_some(), "no status in {text:?}");
        }
        let doc = parse_story_document(&id, "**Status:** In-Progress");
        assert_eq!(doc.status.as_deref(), Some("in-progress"));
        assert_eq!(parse_story_document(&id, "# Story\n").status, None);
    }

    #[test]
    fn tasks_and_subtasks_get_sequential_ids() {
        let content = "\
## Tasks / Subtasks

- [x] Build parser (AC: 1, 2)
  - [x] Epic headings
  - [ ] Story headings
- [ ] Wire CLI

## Dev Notes

- [ ] Not a task
";
        let doc = parse_story_document(&StoryId::from("2.3"), content);
        assert_eq!(ids(&doc), vec!["2.3-T1", "2.3-T2"]);
        let first = &doc.tasks[0];
        assert!(first.complete);
        assert_eq!(first.description, "Build parser (AC: 1, 2)");
        let sub_ids: Vec<_> = first.subtasks.iter().map(|s| s.id.to_string()).collect();
        assert_eq!(sub_ids, vec!["2.3-T1.1", "2.3-T1.2"]);
        assert!(first.subtasks[0].complete);
        assert!(!first.subtasks[1].complete);
        assert!(!doc.tasks[1].complete);
    }

    #[test]
    fn compact_tasks_header_is_recognised() {
        let doc = parse_story_document(&StoryId::from("1.1"), "## Tasks/Subtasks\n- [ ] One\n");
        assert_eq!(ids(&doc), vec!["1.1-T1"]);
    }

    #[test]
    fn review_rounds_follow_regular_tasks() {
        let content = "\
## Tasks / Subtasks

- [ ] Regular

### Review Follow-ups (AI)

- [ ] [AI-Review][HIGH] Fix null check [src/lib.rs:42]
- [x] Tidy imports

### Review Follow-ups Round 2 (AI)

- [ ] [LOW] Rename helper

## Dev Notes

- [ ] ignored
";
        let doc = parse_story_document(&StoryId::from("3.1"), content);
        assert_eq!(ids(&doc), vec!["3.1-T1", "3.1-R1.1", "3.1-R1.2", "3.1-R2.1"]);
        assert_eq!(doc.tasks[1].review_round(), Some(1));
        assert_eq!(doc.tasks[3].review_round(), Some(2));
        assert!(doc.tasks[2].complete);
        assert!(doc.tasks[1].enrichment.tags.is_empty());
    }

    #[test]
    fn repeated_round_keeps_counting() {
        let content = "\
### Review Follow-ups (AI)
- [ ] First
### Review Follow-ups Round 1 (AI)
- [ ] Second
";
        let doc = parse_story_document(&StoryId::from("1.2"), content);
        assert_eq!(ids(&doc), vec!["1.2-R1.1", "1.2-R1.2"]);
    }

    #[test]
    fn subtask_before_any_task_is_dropped() {
        let doc = parse_story_document(
            &StoryId::from("1.1"),
            "## Tasks / Subtasks\n  - [ ] orphan\n- [ ] real\n",
        );
        assert_eq!(ids(&doc), vec!["1.1-T1"]);
        assert!(doc.tasks[0].subtasks.is_empty());
    }
}
