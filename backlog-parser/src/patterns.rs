//! Line patterns shared by the epic and story-document parsers.

use std::sync::LazyLock;

use regex::Regex;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| match Regex::new($pattern) {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern"),
        });
    };
}

// Epic document
static_regex!(FIRST_EPIC_RE, r"^(#{2,4})\s+Epic\s+\d+:\s*\S");
static_regex!(EPIC_HEADING_RE, r"^(#{1,6})\s+Epic\s+(\d+):\s*(.+)$");
static_regex!(STORY_HEADING_RE, r"^(#{1,6})\s+Story\s+(\d+\.\d+):\s*(.+)$");
static_regex!(PHASE_RE, r"(?i)^\*\*(?:Target\s+)?Phase:\*\*\s*(.+)$");
static_regex!(DEPENDENCIES_RE, r"(?i)^\*\*Depend(?:s on|encies):\*\*\s*(.+)$");
static_regex!(REQUIREMENT_RE, r"\b(?:FR|NFR|ARCH)-[\w.]+");
static_regex!(
    AC_MARKER_RE,
    r"(?i)^(?:\*\*Acceptance Criteria:?\*\*:?\s*(.*)|#{1,6}\s+Acceptance Criteria\b.*)$"
);
static_regex!(BOLD_SECTION_RE, r"^\*\*[^*]+:\*\*");

// Story documents
static_regex!(STATUS_RE, r"(?i)^\*?\*?Status:\*?\*?\s*(.+)$");
static_regex!(TASKS_HEADER_RE, r"(?i)^##\s+Tasks\s*/?\s*Subtasks");
static_regex!(TASKS_HEADING_RE, r"(?i)^#{2,}\s+Tasks");
static_regex!(SECTION_HEADING_RE, r"^#{2,}\s+");
static_regex!(
    REVIEW_HEADER_RE,
    r"(?i)^###\s+Review Follow-ups(?:\s+Round\s+(\d+))?(?:\s*\(AI\))?\s*$"
);
static_regex!(TOP_SECTION_RE, r"^##\s+");
static_regex!(TASK_LINE_RE, r"^- \[([ xX])\]\s*(.+)$");
static_regex!(SUBTASK_LINE_RE, r"^\s{2,}- \[([ xX])\]\s*(.+)$");

// Enrichment
static_regex!(PRIORITY_TAG_RE, r"(?i)\[(HIGH|MEDIUM|LOW)\]");
static_regex!(FILE_PATH_TAG_RE, r"\[([^\]]+\.\w+(?::\d+)?)\]\s*$");
static_regex!(AI_REVIEW_TAG_RE, r"(?i)\[AI-Review\]");
static_regex!(KNOWN_TAG_RE, r"(?i)\[(?:HIGH|MEDIUM|LOW|AI-Review)\]\s*");
static_regex!(AC_REFERENCE_RE, r"\(AC:\s*([\d,\s]+)\)");

// Sprint status
static_regex!(STATUS_BLOCK_START_RE, r"^development_status:\s*$");
static_regex!(STATUS_ENTRY_RE, r"^\s+epic-(\d+):\s*(\S+)\s*$");

// Story-file discovery
static_regex!(FLAT_STORY_FILE_RE, r"^(\d+)-(\d+)-");
static_regex!(NESTED_STORY_DIR_RE, r"^\d+\.\d+$");

/// Sorted, unique requirement tokens found in `text`.
///
/// A trailing `.` is sentence punctuation, not part of the token.
pub(crate) fn requirement_tokens<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut tokens: Vec<String> = lines
        .into_iter()
        .flat_map(|line| REQUIREMENT_RE.find_iter(line))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
