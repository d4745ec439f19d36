//! Epic document parsing: epics, their stories, and the metadata in each body.

use std::collections::BTreeSet;

use backlog_core::{Epic, EpicId, ParseWarning, Story, StoryId, WarningKind};
use tracing::debug;

use crate::heading::{detect_heading_levels, heading_depth, HeadingLevels};
use crate::patterns::{
    requirement_tokens, AC_MARKER_RE, BOLD_SECTION_RE, DEPENDENCIES_RE, EPIC_HEADING_RE,
    PHASE_RE, STORY_HEADING_RE,
};

/// Everything extracted from the epic document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpicDocument {
    pub levels: Option<HeadingLevels>,
    pub epics: Vec<Epic>,
    pub stories: Vec<Story>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse epics and stories out of an epic document.
///
/// A document with no epic heading at depth 2–4 yields no entities and a
/// single [`WarningKind::AmbiguousHeadingLevel`] warning.
pub fn parse_epic_document(content: &str) -> EpicDocument {
    let Some(levels) = detect_heading_levels(content) else {
        return EpicDocument {
            warnings: vec![ParseWarning::new(
                "",
                WarningKind::AmbiguousHeadingLevel,
                "no `Epic N:` heading found at depth 2-4",
            )],
            ..EpicDocument::default()
        };
    };
    debug!("epic headings at depth {}, stories at {}", levels.epic, levels.story);

    let lines: Vec<&str> = content.lines().collect();
    let mut doc = EpicDocument {
        levels: Some(levels),
        ..EpicDocument::default()
    };
    let mut seen_epics = BTreeSet::new();
    let mut seen_stories = BTreeSet::new();

    for (index, line) in lines.iter().enumerate() {
        if let Some(caps) = EPIC_HEADING_RE.captures(line) {
            if caps[1].len() != levels.epic {
                continue;
            }
            let id = EpicId::from(&caps[2]);
            if !seen_epics.insert(id.clone()) {
                debug!("epic {id} repeated at line {}; keeping first", index + 1);
                continue;
            }
            let body = &lines[index + 1..section_end(&lines, index + 1, levels.epic, false)];
            doc.epics.push(build_epic(id, caps[3].trim(), body));
        } else if let Some(caps) = STORY_HEADING_RE.captures(line) {
            if caps[1].len() != levels.story {
                continue;
            }
            let id = StoryId::from(&caps[2]);
            if !seen_stories.insert(id.clone()) {
                debug!("story {id} repeated at line {}; keeping first", index + 1);
                continue;
            }
            let body = &lines[index + 1..section_end(&lines, index + 1, levels.story, true)];
            doc.stories.push(build_story(id, caps[3].trim(), body));
        }
    }

    for story in &doc.stories {
        if !seen_epics.contains(&story.epic_id) {
            doc.warnings.push(ParseWarning::new(
                story.id.to_string(),
                WarningKind::DanglingReference,
                format!("story references unknown epic {}", story.epic_id),
            ));
        }
    }

    doc
}

/// Index of the first line at or after `start` that closes a section opened
/// at `depth`: any heading of that depth or shallower. With `keep_ac`, an
/// acceptance-criteria heading at exactly `depth` stays inside the section.
fn section_end(lines: &[&str], start: usize, depth: usize, keep_ac: bool) -> usize {
    lines[start..]
        .iter()
        .position(|line| match heading_depth(line) {
            Some(d) if d < depth => true,
            Some(d) if d == depth => !(keep_ac && AC_MARKER_RE.is_match(line)),
            _ => false,
        })
        .map_or(lines.len(), |offset| start + offset)
}

// ---------------------------------------------------------------------------
// Epic bodies
// ---------------------------------------------------------------------------

fn build_epic(id: EpicId, title: &str, body: &[&str]) -> Epic {
    let mut phase = String::new();
    let mut dependencies = Vec::new();
    let mut description = Vec::new();
    let mut scanned = Vec::new();

    // Metadata lives above the first story heading.
    for raw in body.iter().take_while(|line| heading_depth(line).is_none()) {
        let line = raw.trim();
        scanned.push(line);
        if let Some(caps) = PHASE_RE.captures(line) {
            phase = caps[1].trim().to_string();
        } else if let Some(caps) = DEPENDENCIES_RE.captures(line) {
            dependencies = caps[1]
                .split([',', ';'])
                .map(str::trim)
                .filter(|dep| !dep.is_empty())
                .map(str::to_string)
                .collect();
        } else if !line.is_empty() && !line.starts_with("**") {
            description.push(line);
        }
    }

    Epic {
        id,
        title: title.to_string(),
        description: description.join("\n"),
        phase,
        requirements: requirement_tokens(scanned),
        dependencies,
        status: None,
    }
}

// ---------------------------------------------------------------------------
// Story bodies
// ---------------------------------------------------------------------------

fn build_story(id: StoryId, title: &str, body: &[&str]) -> Story {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut paragraph_done = false;
    let mut criteria: Vec<&str> = Vec::new();
    let mut in_criteria = false;

    for &raw in body {
        if let Some(caps) = AC_MARKER_RE.captures(raw) {
            in_criteria = true;
            if let Some(inline) = caps.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
                criteria.push(inline);
            }
            paragraph_done |= !paragraph.is_empty();
            continue;
        }
        let is_marker = heading_depth(raw).is_some() || BOLD_SECTION_RE.is_match(raw.trim_start());
        if in_criteria {
            if !is_marker {
                criteria.push(raw);
                continue;
            }
            in_criteria = false;
        }
        if paragraph_done {
            continue;
        }
        let line = raw.trim();
        if line.is_empty() || is_marker {
            paragraph_done = !paragraph.is_empty();
        } else {
            paragraph.push(line);
        }
    }

    Story {
        epic_id: id.epic_id(),
        id,
        title: title.to_string(),
        user_story_text: paragraph.join(" "),
        acceptance_criteria: criteria.join("\n").trim().to_string(),
        requirements: requirement_tokens(body.iter().copied()),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Project Epics

## Epic 1: Foundation

Set up the core platform.
**Phase:** MVP
**Dependencies:** none
Covers FR-1, FR-2 and NFR-1.

### Story 1.1: Repository scaffolding

As a developer, I want a repo
so that work can start.

**Acceptance Criteria:**
- Given a clone
- When I build

- Then it passes

**Prerequisites:** none

### Story 1.2: CI pipeline

As a maintainer, I want CI.

## Epic 2: Security

**Target Phase:** Growth
**Depends on:** 1; 3

### Story 2.1: Login

As a user, I want to log in. FR-7
";

    #[test]
    fn extracts_epics_with_metadata() {
        let doc = parse_epic_document(DOC);
        assert_eq!(doc.levels, Some(HeadingLevels { epic: 2, story: 3 }));
        assert_eq!(doc.epics.len(), 2);

        let foundation = &doc.epics[0];
        assert_eq!(foundation.title, "Foundation");
        assert_eq!(foundation.phase, "MVP");
        assert_eq!(foundation.dependencies, vec!["none"]);
        assert_eq!(foundation.requirements, vec!["FR-1", "FR-2", "NFR-1"]);
        assert_eq!(
            foundation.description,
            "Set up the core platform.\nCovers FR-1, FR-2 and NFR-1."
        );

        let security = &doc.epics[1];
        assert_eq!(security.phase, "Growth");
        assert_eq!(security.dependencies, vec!["1", "3"]);
    }

    #[test]
    fn extracts_story_paragraph_and_criteria() {
        let doc = parse_epic_document(DOC);
        let ids: Vec<_> = doc.stories.iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["1.1", "1.2", "2.1"]);

        let scaffolding = &doc.stories[0];
        assert_eq!(scaffolding.epic_id, EpicId::from("1"));
        assert_eq!(
            scaffolding.user_story_text,
            "As a developer, I want a repo so that work can start."
        );
        assert_eq!(
            scaffolding.acceptance_criteria,
            "- Given a clone\n- When I build\n\n- Then it passes"
        );
        assert_eq!(doc.stories[2].requirements, vec!["FR-7"]);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn duplicate_epics_keep_first_occurrence() {
        let doc = parse_epic_document(
            "## Epic 1: Summary\n\nShort.\n\n## Epic 1: Detailed\n\nLong form.\n",
        );
        assert_eq!(doc.epics.len(), 1);
        assert_eq!(doc.epics[0].title, "Summary");
        assert_eq!(doc.epics[0].description, "Short.");
    }

    #[test]
    fn deeper_layout_is_detected() {
        let doc = parse_epic_document(
            "### Epic 4: Reports\n\n#### Story 4.1: Export\n\nAs an admin, I export.\n\n#### Acceptance Criteria\n\n- CSV works\n",
        );
        assert_eq!(doc.epics.len(), 1);
        assert_eq!(doc.stories.len(), 1);
        assert_eq!(doc.stories[0].acceptance_criteria, "- CSV works");
    }

    #[test]
    fn headings_at_other_depths_are_ignored() {
        let doc = parse_epic_document("## Epic 1: A\n\n#### Story 1.1: Too deep\n\n### Story 1.2: Right\n");
        let ids: Vec<_> = doc.stories.iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["1.2"]);
    }

    #[test]
    fn story_under_unknown_epic_is_flagged() {
        let doc = parse_epic_document("## Epic 1: A\n\n### Story 9.1: Orphan\n");
        assert_eq!(doc.stories.len(), 1);
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, WarningKind::DanglingReference);
        assert_eq!(doc.warnings[0].entity_id, "9.1");
    }

    #[test]
    fn no_epic_heading_is_ambiguous() {
        let doc = parse_epic_document("# Epic 1: Top level only\n");
        assert!(doc.epics.is_empty());
        assert_eq!(doc.warnings[0].kind, WarningKind::AmbiguousHeadingLevel);
    }

    #[test]
    fn criteria_heading_closes_epic_but_not_story() {
        let epic = ["## Epic 1: A", "text", "## Acceptance Criteria", "- x", "## Epic 2: B"];
        assert_eq!(section_end(&epic, 1, 2, false), 2);

        let story = [
            "#### Story 4.1: Export",
            "#### Acceptance Criteria",
            "- a",
            "### Epic 5: Next",
        ];
        assert_eq!(section_end(&story, 1, 4, true), 3);
    }
}
