//! Heading-depth detection for epic documents.
//!
//! Authors put epics under `##`, `###` or `####`. The first `Epic N:` heading
//! in that range fixes the epic depth for the whole document; stories sit
//! exactly one level deeper.

use crate::patterns::FIRST_EPIC_RE;

/// Heading depths detected once per document and passed to every matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingLevels {
    pub epic: usize,
    pub story: usize,
}

impl HeadingLevels {
    pub fn from_epic_depth(epic: usize) -> Self {
        Self {
            epic,
            story: epic + 1,
        }
    }
}

/// Find the epic heading depth from the first matching line.
///
/// Returns `None` when the document has no epic heading at depth 2–4.
pub fn detect_heading_levels(content: &str) -> Option<HeadingLevels> {
    content.lines().find_map(|line| {
        FIRST_EPIC_RE
            .captures(line)
            .map(|caps| HeadingLevels::from_epic_depth(caps[1].len()))
    })
}

/// Depth of an ATX heading line (`### Title` → 3), or `None` for body text.
pub(crate) fn heading_depth(line: &str) -> Option<usize> {
    let depth = line.bytes().take_while(|b| *b == b'#').count();
    if depth == 0 || depth > 6 {
        return None;
    }
    match line[depth..].chars().next() {
        Some(c) if c.is_whitespace() => Some(depth),
        _ => None,
    }
}
